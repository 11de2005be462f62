//! Statistics service: record ingestion and cached aggregate reads
//!
//! # Read path (cache-aside)
//!
//! ```text
//!   get_aggregate(entity)
//!         │
//!         ▼
//!   cache.get(key) ──hit──▶ decode ──▶ return
//!         │ miss / read failure / undecodable
//!         ▼
//!   storage.query_aggregate ──▶ scan into empty aggregate
//!         │
//!         ▼
//!   cache.set(key) (best effort) ──▶ return
//! ```
//!
//! # Write path
//!
//! ```text
//!   submit(record) ──▶ validate ──▶ registry lookup ──▶ storage.insert_record
//!                                                              │
//!                              cache.delete(player_<id>) ◀─────┤
//!                              cache.delete(team_<id>)   ◀─────┘
//! ```
//!
//! Storage is authoritative. Failed cache deletes are reported in the result
//! and never undo the insert; the stale entry lives until the next successful
//! invalidation of that key.

mod builder;
pub mod metrics;

pub use builder::StatisticsServiceBuilder;
pub use metrics::{ServiceMetrics, ServiceMetricsSnapshot};

use crate::aggregate::Aggregatable;
use crate::cache::CacheGateway;
use crate::error::{CacheError, Error, Result};
use crate::record::Record;
use crate::registry::EntityRegistry;
use crate::storage::StorageGateway;
use crate::types::{AggregatedRecord, EntityKind, PlayerId, TeamId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where an aggregate was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSource {
    /// Decoded from a cached entry
    Cache,
    /// Computed by an aggregation query
    Storage,
}

/// Result of a single aggregate read
#[derive(Debug, Clone)]
pub struct AggregateRead {
    /// Decoded aggregate
    pub aggregate: AggregatedRecord,
    /// Serialized aggregate; the cached bytes verbatim on a hit
    pub payload: Vec<u8>,
    /// Whether the cache or storage served the read
    pub source: AggregateSource,
    /// Set when a freshly computed aggregate could not be cached
    pub write_back_failure: Option<CacheError>,
}

/// A cache delete that failed after a record was persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationFailure {
    /// Key that may still hold a stale aggregate
    pub key: String,
    /// Error returned by the delete
    pub error: CacheError,
}

/// Outcome of a persisted record
#[derive(Debug, Clone)]
pub struct RecordAdded {
    /// Player the record was stored for
    pub player_id: PlayerId,
    /// Team of that player
    pub team_id: TeamId,
    /// Every key a delete was issued for
    pub invalidated_keys: Vec<String>,
    /// Deletes that failed, in issue order
    pub invalidation_failures: Vec<InvalidationFailure>,
}

impl RecordAdded {
    /// Whether every dependent cache entry was removed
    pub fn fully_invalidated(&self) -> bool {
        self.invalidation_failures.is_empty()
    }
}

/// Orchestrates the registry, the storage gateway and the cache gateway
pub struct StatisticsService {
    registry: EntityRegistry,
    storage: Arc<dyn StorageGateway>,
    cache: Arc<dyn CacheGateway>,
    metrics: ServiceMetrics,
}

impl StatisticsService {
    /// Start building a service
    pub fn builder() -> StatisticsServiceBuilder {
        StatisticsServiceBuilder::new()
    }

    /// Teams and players known to the service
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Snapshot of the operation counters
    pub fn metrics(&self) -> ServiceMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Parse a JSON record payload and submit it
    pub async fn add_record(&self, raw: &[u8]) -> Result<RecordAdded> {
        let record = Record::from_json(raw).map_err(|e| {
            self.metrics.record_rejected();
            e
        })?;
        self.submit(record).await
    }

    /// Validate, persist, then invalidate the player's and team's aggregates
    pub async fn submit(&self, record: Record) -> Result<RecordAdded> {
        if let Err(e) = record.validate() {
            self.metrics.record_rejected();
            return Err(e);
        }

        let Some(player) = self.registry.player(record.id) else {
            self.metrics.record_rejected();
            return Err(Error::NotFound(format!(
                "player with ID {} does not exist",
                record.id
            )));
        };

        if let Err(e) = self.storage.insert_record(&record).await {
            error!(error = %e, player_id = record.id, "Record insert failed");
            return Err(Error::Storage(e));
        }
        self.metrics.record_added();

        let invalidated_keys = vec![player.cache_key(), player.team.cache_key()];
        let mut invalidation_failures = Vec::new();
        for key in &invalidated_keys {
            match self.cache.delete(key).await {
                Ok(()) => self.metrics.record_invalidation(true),
                Err(e) => {
                    self.metrics.record_invalidation(false);
                    warn!(error = %e, key = %key, "Cache invalidation failed, entry may be stale");
                    invalidation_failures.push(InvalidationFailure {
                        key: key.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            player_id = player.id,
            team_id = player.team.id,
            "Record added"
        );

        Ok(RecordAdded {
            player_id: player.id,
            team_id: player.team.id,
            invalidated_keys,
            invalidation_failures,
        })
    }

    /// Cache-aside read of one entity's aggregate
    pub async fn get_aggregate<E>(&self, entity: &E) -> Result<AggregateRead>
    where
        E: Aggregatable + ?Sized,
    {
        let key = entity.cache_key();

        match self.cache.get(&key).await {
            Ok(Some(payload)) => match AggregatedRecord::from_bytes(&payload) {
                Ok(aggregate) => {
                    self.metrics.record_cache_hit();
                    return Ok(AggregateRead {
                        aggregate,
                        payload,
                        source: AggregateSource::Cache,
                        write_back_failure: None,
                    });
                }
                Err(e) => {
                    self.metrics.record_cache_read_failure();
                    warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.metrics.record_cache_read_failure();
                warn!(error = %e, key = %key, "Cache read failed, falling back to storage");
            }
        }

        self.metrics.record_cache_miss();
        debug!(key = %key, "Cache miss");

        let query = entity.aggregation_query();
        self.metrics.record_storage_query();
        let stats = self.storage.query_aggregate(&query).await?;

        let mut aggregate = entity.empty_aggregate();
        aggregate.scan(stats);
        let payload = aggregate.to_bytes()?;

        let write_back_failure = match self.cache.set(&key, &payload).await {
            Ok(()) => None,
            Err(e) => {
                self.metrics.record_write_back_failure();
                warn!(error = %e, key = %key, "Cache write-back failed");
                Some(e)
            }
        };

        Ok(AggregateRead {
            aggregate,
            payload,
            source: AggregateSource::Storage,
            write_back_failure,
        })
    }

    /// Aggregate for a registered player
    pub async fn player_aggregate(&self, player_id: PlayerId) -> Result<AggregateRead> {
        let player = self.registry.player(player_id).ok_or_else(|| {
            Error::NotFound(format!("player with ID {} does not exist", player_id))
        })?;
        self.get_aggregate(player).await
    }

    /// Aggregate for a registered team
    pub async fn team_aggregate(&self, team_id: TeamId) -> Result<AggregateRead> {
        let team = self
            .registry
            .team(team_id)
            .ok_or_else(|| Error::NotFound(format!("team with ID {} does not exist", team_id)))?;
        self.get_aggregate(team).await
    }

    /// Aggregates for every entity of a kind, in ascending ID order
    ///
    /// The first failing read aborts the whole call.
    pub async fn get_all_aggregates(&self, kind: EntityKind) -> Result<Vec<AggregatedRecord>> {
        let mut aggregates = Vec::new();
        match kind {
            EntityKind::Player => {
                for player in self.registry.players() {
                    aggregates.push(self.get_aggregate(player).await?.aggregate);
                }
            }
            EntityKind::Team => {
                for team in self.registry.teams() {
                    aggregates.push(self.get_aggregate(team).await?.aggregate);
                }
            }
        }
        Ok(aggregates)
    }

    /// Team a player belongs to, from the in-memory registry
    pub fn resolve_team_of(&self, player_id: PlayerId) -> Result<TeamId> {
        self.registry.team_of(player_id).ok_or_else(|| {
            Error::NotFound(format!("player with ID {} does not exist", player_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::error::StorageError;
    use crate::storage::InMemoryStorage;

    struct Fixture {
        service: StatisticsService,
        storage: Arc<InMemoryStorage>,
        cache: Arc<InMemoryCache>,
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_team(1, "Lakers")
                .with_team(2, "Celtics")
                .with_player(10, "A", 1)
                .with_player(11, "B", 1)
                .with_player(20, "C", 2),
        );
        let cache = Arc::new(InMemoryCache::new());

        let service = StatisticsService::builder()
            .with_shared_storage(storage.clone())
            .with_shared_cache(cache.clone())
            .build()
            .await
            .unwrap();

        Fixture {
            service,
            storage,
            cache,
        }
    }

    fn record(id: PlayerId, points: i32, minutes: f64) -> Record {
        Record {
            id,
            points,
            rebounds: 5,
            assists: 3,
            steals: 1,
            blocks: 0,
            turnovers: 2,
            fouls: 1,
            minutes,
        }
    }

    #[tokio::test]
    async fn test_single_record_average_equals_record() {
        let f = fixture().await;
        f.service.submit(record(10, 20, 30.0)).await.unwrap();

        let read = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(
            read.aggregate,
            AggregatedRecord {
                id: 10,
                name: "A".to_string(),
                points: 20.0,
                rebounds: 5.0,
                assists: 3.0,
                steals: 1.0,
                blocks: 0.0,
                turnovers: 2.0,
                fouls: 1.0,
                minutes: 30.0,
            }
        );
        assert_eq!(read.source, AggregateSource::Storage);
        assert!(f.cache.contains("player_10"));
    }

    #[tokio::test]
    async fn test_mean_includes_new_record() {
        let f = fixture().await;
        f.service.submit(record(10, 20, 30.0)).await.unwrap();
        assert_eq!(f.service.player_aggregate(10).await.unwrap().aggregate.points, 20.0);

        f.service.submit(record(10, 10, 20.0)).await.unwrap();
        let read = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(read.source, AggregateSource::Storage);
        assert_eq!(read.aggregate.points, 15.0);
        assert_eq!(read.aggregate.minutes, 25.0);
    }

    #[tokio::test]
    async fn test_write_invalidates_exactly_player_and_team_keys() {
        let f = fixture().await;
        let added = f.service.submit(record(11, 8, 12.0)).await.unwrap();

        assert_eq!(added.player_id, 11);
        assert_eq!(added.team_id, 1);
        assert!(added.fully_invalidated());
        assert_eq!(added.invalidated_keys, vec!["player_11", "team_1"]);
        assert_eq!(f.cache.take_deleted(), vec!["player_11", "team_1"]);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_storage_and_is_byte_identical() {
        let f = fixture().await;
        f.service.submit(record(10, 20, 30.0)).await.unwrap();

        let first = f.service.player_aggregate(10).await.unwrap();
        let second = f.service.player_aggregate(10).await.unwrap();
        let third = f.service.player_aggregate(10).await.unwrap();

        assert_eq!(f.storage.aggregate_queries(), 1);
        assert_eq!(second.source, AggregateSource::Cache);
        assert_eq!(first.payload, second.payload);
        assert_eq!(second.payload, third.payload);

        let metrics = f.service.metrics();
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_team_aggregate_recomputed_after_roster_write() {
        let f = fixture().await;
        f.service.submit(record(10, 20, 30.0)).await.unwrap();

        let before = f.service.team_aggregate(1).await.unwrap();
        assert_eq!(before.source, AggregateSource::Storage);
        assert_eq!(before.aggregate.points, 20.0);
        assert!(f.cache.contains("team_1"));

        f.service.submit(record(11, 10, 10.0)).await.unwrap();
        assert!(!f.cache.contains("team_1"));

        let after = f.service.team_aggregate(1).await.unwrap();
        assert_eq!(after.source, AggregateSource::Storage);
        assert_eq!(after.aggregate.points, 15.0);
        assert_eq!(after.aggregate.minutes, 20.0);
        assert_eq!(f.storage.aggregate_queries(), 2);
    }

    #[tokio::test]
    async fn test_other_team_cache_survives_write() {
        let f = fixture().await;
        f.service.team_aggregate(2).await.unwrap();
        f.service.submit(record(10, 20, 30.0)).await.unwrap();
        assert!(f.cache.contains("team_2"));
    }

    #[tokio::test]
    async fn test_entity_without_records_is_zeroed() {
        let f = fixture().await;
        let read = f.service.team_aggregate(2).await.unwrap();
        assert_eq!(read.aggregate, AggregatedRecord::empty(2, "Celtics"));
    }

    #[tokio::test]
    async fn test_unknown_player_rejected_before_persistence() {
        let f = fixture().await;
        let result = f.service.submit(record(99, 20, 30.0)).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(f.storage.insert_calls(), 0);
        assert!(f.cache.take_deleted().is_empty());
        assert_eq!(f.service.metrics().records_rejected, 1);
    }

    #[tokio::test]
    async fn test_invalid_record_rejected_before_persistence() {
        let f = fixture().await;
        let mut bad = record(10, 20, 30.0);
        bad.fouls = 7;
        assert!(matches!(f.service.submit(bad).await, Err(Error::Validation(_))));

        let bad = record(10, 20, 48.1);
        assert!(matches!(f.service.submit(bad).await, Err(Error::Validation(_))));

        assert!(f.service.submit(record(10, 20, 48.0)).await.is_ok());
        assert_eq!(f.storage.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_add_record_parses_payload() {
        let f = fixture().await;
        let raw = br#"{"id":20,"points":31,"rebounds":9,"assists":4,"steals":2,"blocks":1,"turnovers":3,"fouls":4,"minutes":38.5}"#;
        let added = f.service.add_record(raw).await.unwrap();
        assert_eq!(added.team_id, 2);
        assert_eq!(f.storage.record_count(), 1);

        let result = f.service.add_record(br#"{"id":20,"points":"many"}"#).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(f.storage.record_count(), 1);
    }

    #[tokio::test]
    async fn test_add_record_partial_payload() {
        let f = fixture().await;
        let added = f
            .service
            .add_record(br#"{"id":10,"points":20,"minutes":30}"#)
            .await
            .unwrap();
        assert_eq!(added.team_id, 1);

        let read = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(read.aggregate.points, 20.0);
        assert_eq!(read.aggregate.rebounds, 0.0);
        assert_eq!(read.aggregate.minutes, 30.0);
    }

    #[tokio::test]
    async fn test_storage_failure_on_insert_skips_invalidation() {
        let f = fixture().await;
        f.storage.set_fail_writes(true);

        let result = f.service.submit(record(10, 20, 30.0)).await;
        assert!(matches!(result, Err(Error::Storage(StorageError::Query(_)))));
        assert!(f.cache.take_deleted().is_empty());
    }

    #[tokio::test]
    async fn test_invalidation_failure_keeps_write() {
        let f = fixture().await;
        f.service.player_aggregate(10).await.unwrap();
        f.cache.set_fail_deletes(true);

        let added = f.service.submit(record(10, 20, 30.0)).await.unwrap();
        assert!(!added.fully_invalidated());
        let failed: Vec<_> = added
            .invalidation_failures
            .iter()
            .map(|failure| failure.key.as_str())
            .collect();
        assert_eq!(failed, vec!["player_10", "team_1"]);
        assert_eq!(f.storage.record_count(), 1);

        // Stale entry is served until the key is invalidated
        let stale = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(stale.source, AggregateSource::Cache);
        assert_eq!(stale.aggregate.points, 0.0);

        f.cache.set_fail_deletes(false);
        f.service.submit(record(10, 10, 30.0)).await.unwrap();
        let fresh = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(fresh.aggregate.points, 15.0);
    }

    #[tokio::test]
    async fn test_write_back_failure_still_returns_aggregate() {
        let f = fixture().await;
        f.service.submit(record(10, 20, 30.0)).await.unwrap();
        f.cache.set_fail_writes(true);

        let read = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(read.aggregate.points, 20.0);
        assert!(matches!(read.write_back_failure, Some(CacheError::Connection(_))));
        assert!(!f.cache.contains("player_10"));
        assert_eq!(f.service.metrics().write_back_failures, 1);
    }

    #[tokio::test]
    async fn test_cache_read_failure_falls_back_to_storage() {
        let f = fixture().await;
        f.service.submit(record(10, 20, 30.0)).await.unwrap();
        f.service.player_aggregate(10).await.unwrap();
        f.cache.set_fail_reads(true);

        let read = f.service.player_aggregate(10).await.unwrap();
        assert_eq!(read.source, AggregateSource::Storage);
        assert_eq!(read.aggregate.points, 20.0);
        assert_eq!(f.service.metrics().cache_read_failures, 1);
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_recomputed() {
        let f = fixture().await;
        f.cache.insert_raw("team_1", b"not an aggregate");

        let read = f.service.team_aggregate(1).await.unwrap();
        assert_eq!(read.source, AggregateSource::Storage);
        assert_eq!(f.service.metrics().cache_read_failures, 1);

        let cached = f.service.team_aggregate(1).await.unwrap();
        assert_eq!(cached.source, AggregateSource::Cache);
        assert_eq!(cached.aggregate.name, "Lakers");
    }

    #[tokio::test]
    async fn test_storage_failure_on_miss_surfaces() {
        let f = fixture().await;
        f.storage.set_fail_reads(true);
        let result = f.service.player_aggregate(10).await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_unknown_entities_not_found() {
        let f = fixture().await;
        assert!(matches!(f.service.player_aggregate(99).await, Err(Error::NotFound(_))));
        assert!(matches!(f.service.team_aggregate(99).await, Err(Error::NotFound(_))));
        assert!(matches!(f.service.resolve_team_of(99), Err(Error::NotFound(_))));
        assert_eq!(f.service.resolve_team_of(20).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_all_aggregates_in_id_order() {
        let f = fixture().await;
        f.service.submit(record(20, 30, 40.0)).await.unwrap();
        f.service.submit(record(10, 10, 20.0)).await.unwrap();

        let players = f.service.get_all_aggregates(EntityKind::Player).await.unwrap();
        let ids: Vec<_> = players.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![10, 11, 20]);
        assert_eq!(players[2].points, 30.0);

        let teams = f.service.get_all_aggregates(EntityKind::Team).await.unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].name, "Lakers");
        assert_eq!(teams[0].points, 10.0);
    }

    #[tokio::test]
    async fn test_get_all_aggregates_aborts_on_failure() {
        let f = fixture().await;
        f.service.player_aggregate(10).await.unwrap();
        f.storage.set_fail_reads(true);

        let result = f.service.get_all_aggregates(EntityKind::Player).await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_and_reads() {
        let f = fixture().await;
        let service = Arc::new(f.service);

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.submit(record(10, i % 2 * 10, 30.0)).await.unwrap();
                service.team_aggregate(1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Any stale write-back is cleared by one more invalidating write
        service.submit(record(11, 5, 30.0)).await.unwrap();
        let team = service.team_aggregate(1).await.unwrap();
        assert_eq!(f.storage.record_count(), 21);
        assert!((team.aggregate.points - 105.0 / 21.0).abs() < 1e-9);
    }
}
