//! Entity registry: teams and players loaded once at startup
//!
//! The registry is immutable after [`EntityRegistry::load`], so concurrent
//! readers need no locking. Roster changes require a restart.

use crate::error::{Error, Result};
use crate::storage::StorageGateway;
use crate::types::{Player, PlayerId, Team, TeamId};
use std::collections::BTreeMap;
use tracing::info;

/// Load every team keyed by ID
pub async fn load_teams(storage: &dyn StorageGateway) -> Result<BTreeMap<TeamId, Team>> {
    let rows = storage.load_teams().await?;
    Ok(rows.into_iter().map(|team| (team.id, team)).collect())
}

/// Load every player keyed by ID, attaching a copy of its team
///
/// A player referencing a team missing from `teams` is a `NotFound` error.
pub async fn load_players(
    storage: &dyn StorageGateway,
    teams: &BTreeMap<TeamId, Team>,
) -> Result<BTreeMap<PlayerId, Player>> {
    let rows = storage.load_players().await?;

    let mut players = BTreeMap::new();
    for row in rows {
        let team = teams.get(&row.team_id).ok_or_else(|| {
            Error::NotFound(format!(
                "team with ID {} not found (referenced by player {})",
                row.team_id, row.id
            ))
        })?;
        players.insert(row.id, Player::new(row.id, row.name, team.clone()));
    }

    Ok(players)
}

/// Read-only roster of teams and players
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    teams: BTreeMap<TeamId, Team>,
    players: BTreeMap<PlayerId, Player>,
}

impl EntityRegistry {
    /// Load teams, then players, from storage
    pub async fn load(storage: &dyn StorageGateway) -> Result<Self> {
        let teams = load_teams(storage).await?;
        let players = load_players(storage, &teams).await?;

        info!(
            teams = teams.len(),
            players = players.len(),
            "Entity registry loaded"
        );
        Ok(Self { teams, players })
    }

    /// Look up a team by ID
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    /// Look up a player by ID
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Team the player belonged to when the registry was loaded
    pub fn team_of(&self, player_id: PlayerId) -> Option<TeamId> {
        self.players.get(&player_id).map(|p| p.team.id)
    }

    /// Teams in ascending ID order
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    /// Players in ascending ID order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of registered teams
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Number of registered players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
