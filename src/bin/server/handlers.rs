//! HTTP Handlers for the statistics server
//!
//! This module contains all HTTP endpoint handlers for the REST API and maps
//! service errors onto status codes.

use super::types::*;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nba_stats::{AggregateRead, AggregatedRecord, EntityKind, Error, StatisticsService};
use std::sync::Arc;
use tracing::{error, warn};

/// Prefix for exported metric names
const METRIC_PREFIX: &str = "nba_stats";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state
pub struct AppState {
    pub service: StatisticsService,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Error returned by a handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        if e.is_client_error() {
            return Self::bad_request(e.to_string());
        }

        error!(error = %e, "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Parse an integer ID query parameter
fn parse_id(raw: Option<&str>, name: &str) -> Result<i32, ApiError> {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .ok_or_else(|| ApiError::bad_request(format!("Invalid {}", name)))
}

fn aggregate_response(read: AggregateRead) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        read.payload,
    )
        .into_response()
}

// =============================================================================
// Health & Metrics Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let registry = state.service.registry();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        teams: registry.team_count(),
        players: registry.player_count(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.service.metrics().to_prometheus(METRIC_PREFIX);
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], body)
}

// =============================================================================
// Write Handlers
// =============================================================================

/// Submit a game record
pub async fn add_record(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    let added = state.service.add_record(&body).await?;

    if !added.fully_invalidated() {
        warn!(
            player_id = added.player_id,
            failed = added.invalidation_failures.len(),
            "Record stored with stale cache entries"
        );
    }

    Ok((StatusCode::CREATED, Json(added.into())))
}

// =============================================================================
// Aggregate Handlers
// =============================================================================

/// Averages for one player
pub async fn player_aggregate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayerParams>,
) -> Result<Response, ApiError> {
    let player_id = parse_id(params.player_id.as_deref(), "playerId")?;
    let read = state.service.player_aggregate(player_id).await?;
    Ok(aggregate_response(read))
}

/// Averages for one team
pub async fn team_aggregate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TeamParams>,
) -> Result<Response, ApiError> {
    let team_id = parse_id(params.team_id.as_deref(), "teamId")?;
    let read = state.service.team_aggregate(team_id).await?;
    Ok(aggregate_response(read))
}

/// Averages for every player
pub async fn all_players_aggregate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AggregatedRecord>>, ApiError> {
    let aggregates = state.service.get_all_aggregates(EntityKind::Player).await?;
    Ok(Json(aggregates))
}

/// Averages for every team
pub async fn all_teams_aggregate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AggregatedRecord>>, ApiError> {
    let aggregates = state.service.get_all_aggregates(EntityKind::Team).await?;
    Ok(Json(aggregates))
}

// =============================================================================
// Router
// =============================================================================

/// Build the router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/record", post(add_record))
        .route("/aggregate/player", get(player_aggregate))
        .route("/aggregate/team", get(team_aggregate))
        .route("/aggregate/players", get(all_players_aggregate))
        .route("/aggregate/teams", get(all_teams_aggregate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use nba_stats::{InMemoryCache, InMemoryStorage};
    use tower::ServiceExt;

    const RECORD: &str = r#"{"id":10,"points":20,"rebounds":5,"assists":3,"steals":1,"blocks":0,"turnovers":2,"fouls":1,"minutes":30}"#;

    struct TestApp {
        router: Router,
        storage: Arc<InMemoryStorage>,
        cache: Arc<InMemoryCache>,
    }

    async fn app() -> TestApp {
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_team(1, "Lakers")
                .with_player(10, "A", 1)
                .with_player(11, "B", 1),
        );
        let cache = Arc::new(InMemoryCache::new());
        let service = StatisticsService::builder()
            .with_shared_storage(storage.clone())
            .with_shared_cache(cache.clone())
            .build()
            .await
            .unwrap();

        TestApp {
            router: build_router(Arc::new(AppState { service })),
            storage,
            cache,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_record(body: &str) -> Request<Body> {
        Request::post("/record")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_uri(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_add_record_then_read_player() {
        let app = app().await;

        let (status, body) = send(&app.router, post_record(RECORD)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["player_id"], 10);
        assert_eq!(body["team_id"], 1);
        assert!(body.get("stale_keys").is_none());

        let (status, body) = send(&app.router, get_uri("/aggregate/player?playerId=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "A");
        assert_eq!(body["points"], 20.0);
        assert_eq!(body["minutes"], 30.0);
    }

    #[tokio::test]
    async fn test_invalid_records_are_bad_requests() {
        let app = app().await;

        let fouls = RECORD.replace("\"fouls\":1", "\"fouls\":7");
        let unknown = RECORD.replace("\"id\":10", "\"id\":99");
        for body in [fouls.as_str(), unknown.as_str(), "{not json"] {
            let (status, json) = send(&app.router, post_record(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert!(json["error"].is_string());
        }
        assert_eq!(app.storage.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_id_parameters() {
        let app = app().await;
        for uri in [
            "/aggregate/player?playerId=abc",
            "/aggregate/player",
            "/aggregate/player?playerId=99",
            "/aggregate/team?teamId=",
            "/aggregate/team?teamId=5",
        ] {
            let (status, _) = send(&app.router, get_uri(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_team_and_bulk_aggregates() {
        let app = app().await;
        send(&app.router, post_record(RECORD)).await;
        send(&app.router, post_record(&RECORD.replace("\"id\":10", "\"id\":11"))).await;

        let (status, body) = send(&app.router, get_uri("/aggregate/team?teamId=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Lakers");
        assert_eq!(body["points"], 20.0);

        let (status, body) = send(&app.router, get_uri("/aggregate/players")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = send(&app.router, get_uri("/aggregate/teams")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_stale_keys_reported() {
        let app = app().await;
        app.cache.set_fail_deletes(true);

        let (status, body) = send(&app.router, post_record(RECORD)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["stale_keys"], serde_json::json!(["player_10", "team_1"]));
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_error() {
        let app = app().await;
        app.storage.set_fail_writes(true);
        let (status, _) = send(&app.router, post_record(RECORD)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        app.storage.set_fail_reads(true);
        let (status, _) = send(&app.router, get_uri("/aggregate/teams")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let app = app().await;
        let (status, body) = send(&app.router, get_uri("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["players"], 2);

        send(&app.router, post_record(RECORD)).await;
        let response = app.router.clone().oneshot(get_uri("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(text.to_vec()).unwrap();
        assert!(text.contains("nba_stats_records_added_total 1"));
        assert!(text.contains("nba_stats_invalidations_total 2"));
    }
}
