//! Cache gateway for aggregated statistics
//!
//! Values are opaque byte strings keyed by `player_<id>` / `team_<id>`.
//! Entries never expire; the statistics service deletes them when a record
//! for a dependent entity is written.
//!
//! # Backends
//!
//! - [`RedisCache`]: shared Redis instance, used by the server
//! - [`InMemoryCache`]: process-local map for tests and single-node runs
//!
//! # Example
//!
//! ```rust,ignore
//! use nba_stats::cache::{CacheGateway, InMemoryCache};
//!
//! let cache = InMemoryCache::new();
//! cache.set("player_10", b"{...}").await?;
//! assert!(cache.get("player_10").await?.is_some());
//! cache.delete("player_10").await?;
//! ```

use crate::error::CacheError;
use async_trait::async_trait;

mod memory;
mod redis;

pub use self::memory::InMemoryCache;
pub use self::redis::RedisCache;

/// Result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key/value operations against the cache store
#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Fetch a value; `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value without expiry
    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    /// Remove a key; removing an absent key succeeds
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
