//! Request and response bodies for the HTTP API

use nba_stats::{PlayerId, RecordAdded, TeamId};
use serde::{Deserialize, Serialize};

/// `GET /aggregate/player` query string
#[derive(Debug, Deserialize)]
pub struct PlayerParams {
    #[serde(rename = "playerId")]
    pub player_id: Option<String>,
}

/// `GET /aggregate/team` query string
#[derive(Debug, Deserialize)]
pub struct TeamParams {
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
}

/// Body returned by `POST /record`
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    /// Keys that could not be invalidated and may serve stale data
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stale_keys: Vec<String>,
}

impl From<RecordAdded> for RecordResponse {
    fn from(added: RecordAdded) -> Self {
        Self {
            player_id: added.player_id,
            team_id: added.team_id,
            stale_keys: added
                .invalidation_failures
                .into_iter()
                .map(|failure| failure.key)
                .collect(),
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub teams: usize,
    pub players: usize,
}
