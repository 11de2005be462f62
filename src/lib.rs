//! NBA statistics service
//!
//! Accepts per-player game records, persists them to a relational store and
//! serves per-player and per-team averages through a cache-aside read path.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  StatisticsService                        │
//! │   submit / add_record        get_aggregate / get_all      │
//! ├──────────────┬────────────────────────┬──────────────────┤
//! │ EntityRegistry│  Aggregatable (trait)  │ ServiceMetrics   │
//! │ teams/players │  Player, Team          │ atomic counters  │
//! └──────┬───────┴────────────┬───────────┴──────────────────┘
//!        │                    │
//!  ┌─────▼──────────┐   ┌─────▼─────────┐
//!  │ StorageGateway │   │ CacheGateway  │
//!  │ Postgres / mem │   │ Redis / mem   │
//!  └────────────────┘   └───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nba_stats::{InMemoryCache, InMemoryStorage, StatisticsService};
//!
//! let service = StatisticsService::builder()
//!     .with_storage(InMemoryStorage::new().with_team(1, "Lakers").with_player(10, "A", 1))
//!     .with_cache(InMemoryCache::new())
//!     .build()
//!     .await?;
//!
//! service.add_record(br#"{"id":10,"points":20,"rebounds":5,"assists":3,
//!     "steals":1,"blocks":0,"turnovers":2,"fouls":1,"minutes":30}"#).await?;
//! let read = service.player_aggregate(10).await?;
//! assert_eq!(read.aggregate.points, 20.0);
//! ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod record;
pub mod registry;
pub mod service;
pub mod storage;
pub mod types;

pub use aggregate::{Aggregatable, AggregateScope, AggregationQuery};
pub use cache::{CacheGateway, InMemoryCache, RedisCache};
pub use error::{CacheError, Error, Result, StorageError};
pub use record::Record;
pub use registry::EntityRegistry;
pub use service::{
    AggregateRead, AggregateSource, RecordAdded, StatisticsService, StatisticsServiceBuilder,
};
pub use storage::{InMemoryStorage, PostgresConfig, PostgresStorage, StorageGateway};
pub use types::{AggregatedRecord, EntityKind, Player, PlayerId, Team, TeamId};
