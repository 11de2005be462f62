//! In-process storage gateway
//!
//! Mirrors the relational schema with plain vectors and computes averages the
//! same way the SQL does, including the zero row for entities without records.

use super::{StorageGateway, StorageResult};
use crate::aggregate::{AggregateScope, AggregationQuery};
use crate::error::StorageError;
use crate::record::Record;
use crate::types::{PlayerRow, StatLine, Team};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
struct Tables {
    teams: Vec<Team>,
    players: Vec<PlayerRow>,
    records: Vec<Record>,
}

/// Storage gateway holding its tables in memory
#[derive(Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    insert_calls: AtomicU64,
    aggregate_queries: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a team row
    pub fn with_team(self, id: i32, name: &str) -> Self {
        self.tables.write().teams.push(Team::new(id, name));
        self
    }

    /// Add a player row referencing `team_id`
    pub fn with_player(self, id: i32, name: &str, team_id: i32) -> Self {
        self.tables.write().players.push(PlayerRow {
            id,
            name: name.to_string(),
            team_id,
        });
        self
    }

    /// Make every read fail with a connection error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every insert fail with a query error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of insert attempts, failed ones included
    pub fn insert_calls(&self) -> u64 {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of aggregation queries executed
    pub fn aggregate_queries(&self) -> u64 {
        self.aggregate_queries.load(Ordering::SeqCst)
    }

    /// Number of persisted records
    pub fn record_count(&self) -> usize {
        self.tables.read().records.len()
    }

    fn check_reads(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("storage unavailable".to_string()));
        }
        Ok(())
    }
}

fn average<'a>(records: impl Iterator<Item = &'a Record>) -> StatLine {
    let mut sum = StatLine::default();
    let mut count = 0usize;

    for r in records {
        sum.points += r.points as f64;
        sum.rebounds += r.rebounds as f64;
        sum.assists += r.assists as f64;
        sum.steals += r.steals as f64;
        sum.blocks += r.blocks as f64;
        sum.turnovers += r.turnovers as f64;
        sum.fouls += r.fouls as f64;
        sum.minutes += r.minutes;
        count += 1;
    }

    if count == 0 {
        return StatLine::default();
    }

    let n = count as f64;
    StatLine {
        points: sum.points / n,
        rebounds: sum.rebounds / n,
        assists: sum.assists / n,
        steals: sum.steals / n,
        blocks: sum.blocks / n,
        turnovers: sum.turnovers / n,
        fouls: sum.fouls / n,
        minutes: sum.minutes / n,
    }
}

#[async_trait]
impl StorageGateway for InMemoryStorage {
    async fn load_teams(&self) -> StorageResult<Vec<Team>> {
        self.check_reads()?;
        Ok(self.tables.read().teams.clone())
    }

    async fn load_players(&self) -> StorageResult<Vec<PlayerRow>> {
        self.check_reads()?;
        Ok(self.tables.read().players.clone())
    }

    async fn insert_record(&self, record: &Record) -> StorageResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Query("insert rejected".to_string()));
        }

        let mut tables = self.tables.write();
        // Same foreign key the schema enforces
        if !tables.players.iter().any(|p| p.id == record.id) {
            return Err(StorageError::Query(format!(
                "records.player_id {} violates foreign key",
                record.id
            )));
        }
        tables.records.push(record.clone());
        Ok(())
    }

    async fn query_aggregate(&self, query: &AggregationQuery) -> StorageResult<StatLine> {
        self.check_reads()?;
        self.aggregate_queries.fetch_add(1, Ordering::SeqCst);

        let tables = self.tables.read();
        let stats = match query.scope {
            AggregateScope::Player(id) => average(tables.records.iter().filter(|r| r.id == id)),
            AggregateScope::Team(team_id) => {
                let roster: Vec<i32> = tables
                    .players
                    .iter()
                    .filter(|p| p.team_id == team_id)
                    .map(|p| p.id)
                    .collect();
                average(tables.records.iter().filter(|r| roster.contains(&r.id)))
            }
        };
        Ok(stats)
    }
}
