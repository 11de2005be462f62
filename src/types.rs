//! Core data types used throughout the service

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a team
pub type TeamId = i32;

/// Unique identifier for a player
pub type PlayerId = i32;

/// A team as loaded at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Team identifier
    pub id: TeamId,
    /// Display name
    pub name: String,
}

impl Team {
    /// Create a new team
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A player as loaded at startup
///
/// `team` is a copy of the owning team taken when the registry was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player identifier
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Owning team
    pub team: Team,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: impl Into<String>, team: Team) -> Self {
        Self {
            id,
            name: name.into(),
            team,
        }
    }
}

/// Raw player row before its team reference is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    /// Player identifier
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Referenced team, not yet checked
    pub team_id: TeamId,
}

/// Kind of aggregatable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A single player
    Player,
    /// A team, aggregated over its roster
    Team,
}

impl EntityKind {
    /// Lowercase name, also used as the cache key prefix
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Team => "team",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight per-game averages, in query column order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatLine {
    /// Average points
    pub points: f64,
    /// Average rebounds
    pub rebounds: f64,
    /// Average assists
    pub assists: f64,
    /// Average steals
    pub steals: f64,
    /// Average blocks
    pub blocks: f64,
    /// Average turnovers
    pub turnovers: f64,
    /// Average personal fouls
    pub fouls: f64,
    /// Average minutes played
    pub minutes: f64,
}

impl From<(f64, f64, f64, f64, f64, f64, f64, f64)> for StatLine {
    fn from(row: (f64, f64, f64, f64, f64, f64, f64, f64)) -> Self {
        Self {
            points: row.0,
            rebounds: row.1,
            assists: row.2,
            steals: row.3,
            blocks: row.4,
            turnovers: row.5,
            fouls: row.6,
            minutes: row.7,
        }
    }
}

/// Cached per-entity summary of average statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    /// Player or team identifier
    pub id: i32,
    /// Player or team name
    pub name: String,
    /// Average points per game
    pub points: f64,
    /// Average rebounds per game
    pub rebounds: f64,
    /// Average assists per game
    pub assists: f64,
    /// Average steals per game
    pub steals: f64,
    /// Average blocks per game
    pub blocks: f64,
    /// Average turnovers per game
    pub turnovers: f64,
    /// Average personal fouls per game
    pub fouls: f64,
    /// Average minutes per game
    pub minutes: f64,
}

impl AggregatedRecord {
    /// Create an aggregate with every statistic at zero
    pub fn empty(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            points: 0.0,
            rebounds: 0.0,
            assists: 0.0,
            steals: 0.0,
            blocks: 0.0,
            turnovers: 0.0,
            fouls: 0.0,
            minutes: 0.0,
        }
    }

    /// Fill in the averages from a query row
    pub fn scan(&mut self, stats: StatLine) {
        self.points = stats.points;
        self.rebounds = stats.rebounds;
        self.assists = stats.assists;
        self.steals = stats.steals;
        self.blocks = stats.blocks;
        self.turnovers = stats.turnovers;
        self.fouls = stats.fouls;
        self.minutes = stats.minutes;
    }

    /// The averages without the identity fields
    pub fn stats(&self) -> StatLine {
        StatLine {
            points: self.points,
            rebounds: self.rebounds,
            assists: self.assists,
            steals: self.steals,
            blocks: self.blocks,
            turnovers: self.turnovers,
            fouls: self.fouls,
            minutes: self.minutes,
        }
    }

    /// Serialize to the cached JSON form
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from the cached JSON form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
