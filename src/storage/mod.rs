//! Storage gateway: the relational store behind the service
//!
//! The store is the source of truth for rosters and submitted records.
//! Implementations:
//!
//! - [`PostgresStorage`]: sqlx connection pool, used by the server
//! - [`InMemoryStorage`]: tables kept in process, with failure injection for tests

use crate::aggregate::AggregationQuery;
use crate::error::StorageError;
use crate::record::Record;
use crate::types::{PlayerRow, StatLine, Team};
use async_trait::async_trait;

mod memory;
mod postgres;

pub use memory::InMemoryStorage;
pub use postgres::{PostgresConfig, PostgresStorage};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Relational store operations needed by the service
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// All teams
    async fn load_teams(&self) -> StorageResult<Vec<Team>>;

    /// All players with their raw team reference
    async fn load_players(&self) -> StorageResult<Vec<PlayerRow>>;

    /// Persist one validated record
    async fn insert_record(&self, record: &Record) -> StorageResult<()>;

    /// Run an aggregation query and return its single row
    async fn query_aggregate(&self, query: &AggregationQuery) -> StorageResult<StatLine>;
}
