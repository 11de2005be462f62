//! Submitted game records and their validation rules

use crate::error::{Error, Result};
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// Maximum personal fouls in a single game
pub const MAX_FOULS: i32 = 6;

/// Length of a regulation game in minutes
pub const MAX_MINUTES: f64 = 48.0;

/// One player's line for one game
///
/// Statistics missing from a payload decode as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// Player the record belongs to
    pub id: PlayerId,
    /// Points scored
    pub points: i32,
    /// Total rebounds
    pub rebounds: i32,
    /// Assists
    pub assists: i32,
    /// Steals
    pub steals: i32,
    /// Blocked shots
    pub blocks: i32,
    /// Turnovers
    pub turnovers: i32,
    /// Personal fouls, at most [`MAX_FOULS`]
    pub fouls: i32,
    /// Minutes played, at most [`MAX_MINUTES`]
    pub minutes: f64,
}

impl Record {
    /// Decode a record from its JSON payload
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| Error::Validation(format!("Invalid record payload: {}", e)))
    }

    /// Check the range rules for every field
    pub fn validate(&self) -> Result<()> {
        if self.fouls > MAX_FOULS {
            return Err(Error::Validation(format!(
                "fouls cannot be greater than {}",
                MAX_FOULS
            )));
        }

        // NaN fails the range check as well
        if !(0.0..=MAX_MINUTES).contains(&self.minutes) {
            return Err(Error::Validation(format!(
                "minutes must be between 0 and {}",
                MAX_MINUTES
            )));
        }

        let counts = [
            ("points", self.points),
            ("rebounds", self.rebounds),
            ("assists", self.assists),
            ("steals", self.steals),
            ("blocks", self.blocks),
            ("turnovers", self.turnovers),
            ("fouls", self.fouls),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, value)| *value < 0) {
            return Err(Error::Validation(format!("{} cannot be negative", name)));
        }

        Ok(())
    }
}
