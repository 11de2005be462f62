//! NBA Statistics HTTP Server
//!
//! Accepts game records and serves player and team averages over a
//! Postgres store with a Redis cache in front of the aggregates.
//!
//! # Endpoints
//!
//! ## Write
//! - `POST /record` - Submit one player's game record
//!
//! ## Query
//! - `GET /aggregate/player?playerId=<id>` - Averages for one player
//! - `GET /aggregate/team?teamId=<id>` - Averages for one team
//! - `GET /aggregate/players` - Averages for every player
//! - `GET /aggregate/teams` - Averages for every team
//!
//! ## Admin
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! # Configuration
//!
//! The server reads configuration from:
//! 1. `NBA_STATS_CONFIG` environment variable (path to TOML file)
//! 2. `./nba-stats.toml` in current directory
//! 3. Default configuration
//!
//! `POSTGRES_HOST`, `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_DB` and
//! `REDIS_HOST` override the file when set.
//!
//! # Example
//!
//! ```bash
//! POSTGRES_HOST=db POSTGRES_USER=nba POSTGRES_PASSWORD=nba POSTGRES_DB=nba \
//!   REDIS_HOST=cache ./server
//!
//! curl -X POST http://localhost:8080/record \
//!   -d '{"id":10,"points":20,"rebounds":5,"assists":3,"steals":1,"blocks":0,"turnovers":2,"fouls":1,"minutes":30}'
//!
//! curl "http://localhost:8080/aggregate/player?playerId=10"
//! ```

#[path = "server/config.rs"]
mod config;
#[path = "server/handlers.rs"]
mod handlers;
#[path = "server/types.rs"]
mod types;

use config::{load_config, CacheBackend, ServerConfig};
use handlers::{build_router, AppState};
use nba_stats::{CacheGateway, InMemoryCache, PostgresStorage, RedisCache, StatisticsService};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};

// =============================================================================
// Initialization
// =============================================================================

async fn init_cache(
    config: &ServerConfig,
) -> Result<Arc<dyn CacheGateway>, Box<dyn std::error::Error>> {
    match config.cache.backend {
        CacheBackend::Redis => {
            let cache = RedisCache::connect(&config.cache.redis_url).await?;
            info!(url = %config.cache.redis_url, "Connected to Redis");
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            warn!("Using in-process cache, entries are not shared between instances");
            Ok(Arc::new(InMemoryCache::new()))
        }
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nba_stats=info".parse()?)
                .add_directive("server=info".parse()?),
        )
        .init();

    info!("NBA stats server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config();
    info!("Listen address: {}", config.listen_addr);

    info!("Connecting to database...");
    let storage = Arc::new(PostgresStorage::connect(&config.database).await?);
    let cache = init_cache(&config).await?;

    let service = StatisticsService::builder()
        .with_shared_storage(storage.clone())
        .with_shared_cache(cache)
        .build()
        .await?;
    info!(
        teams = service.registry().team_count(),
        players = service.registry().player_count(),
        "Entity registry loaded"
    );

    let app = build_router(Arc::new(AppState { service }));

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.close().await;
    info!("Server shutdown complete");
    Ok(())
}
