//! Aggregation protocol shared by players and teams
//!
//! Each aggregatable entity knows how to build its empty aggregate, the cache
//! key its aggregate lives under, and the query that computes its averages.
//! The statistics service drives the cache-aside read through this trait only.

use crate::types::{AggregatedRecord, EntityKind, Player, PlayerId, Team, TeamId};

/// Average query for a single player
pub const PLAYER_AGGREGATE_SQL: &str = "SELECT \
    COALESCE(AVG(r.points), 0)::float8, \
    COALESCE(AVG(r.rebounds), 0)::float8, \
    COALESCE(AVG(r.assists), 0)::float8, \
    COALESCE(AVG(r.steals), 0)::float8, \
    COALESCE(AVG(r.blocks), 0)::float8, \
    COALESCE(AVG(r.turnovers), 0)::float8, \
    COALESCE(AVG(r.fouls), 0)::float8, \
    COALESCE(AVG(r.minutes), 0)::float8 \
    FROM records r \
    WHERE r.player_id = $1";

/// Average query over every record of every player on a team
pub const TEAM_AGGREGATE_SQL: &str = "SELECT \
    COALESCE(AVG(r.points), 0)::float8, \
    COALESCE(AVG(r.rebounds), 0)::float8, \
    COALESCE(AVG(r.assists), 0)::float8, \
    COALESCE(AVG(r.steals), 0)::float8, \
    COALESCE(AVG(r.blocks), 0)::float8, \
    COALESCE(AVG(r.turnovers), 0)::float8, \
    COALESCE(AVG(r.fouls), 0)::float8, \
    COALESCE(AVG(r.minutes), 0)::float8 \
    FROM records r \
    JOIN players p ON r.player_id = p.id \
    WHERE p.team_id = $1";

/// Which rows an aggregation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateScope {
    /// Records of one player
    Player(PlayerId),
    /// Records of every player on a team
    Team(TeamId),
}

impl AggregateScope {
    /// Value bound to the query's single parameter
    pub fn entity_id(&self) -> i32 {
        match self {
            AggregateScope::Player(id) | AggregateScope::Team(id) => *id,
        }
    }

    /// Kind of entity the scope names
    pub fn kind(&self) -> EntityKind {
        match self {
            AggregateScope::Player(_) => EntityKind::Player,
            AggregateScope::Team(_) => EntityKind::Team,
        }
    }
}

/// Parameterized query yielding one row of eight averages
///
/// Column order: points, rebounds, assists, steals, blocks, turnovers, fouls, minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationQuery {
    /// Rows to aggregate
    pub scope: AggregateScope,
    /// SQL text with one `$1` parameter
    pub sql: &'static str,
}

impl AggregationQuery {
    /// Averages over one player's records
    pub fn player(id: PlayerId) -> Self {
        Self {
            scope: AggregateScope::Player(id),
            sql: PLAYER_AGGREGATE_SQL,
        }
    }

    /// Averages over a team's records
    pub fn team(id: TeamId) -> Self {
        Self {
            scope: AggregateScope::Team(id),
            sql: TEAM_AGGREGATE_SQL,
        }
    }
}

/// Build the cache key for an entity
pub fn cache_key(kind: EntityKind, id: i32) -> String {
    format!("{}_{}", kind.name(), id)
}

/// Capability every aggregatable entity kind implements
pub trait Aggregatable: Send + Sync {
    /// Aggregate carrying this entity's identity with all statistics at zero
    fn empty_aggregate(&self) -> AggregatedRecord;

    /// Key the entity's aggregate is cached under
    fn cache_key(&self) -> String;

    /// Query that computes the entity's averages
    fn aggregation_query(&self) -> AggregationQuery;
}

impl Aggregatable for Player {
    fn empty_aggregate(&self) -> AggregatedRecord {
        AggregatedRecord::empty(self.id, self.name.clone())
    }

    fn cache_key(&self) -> String {
        cache_key(EntityKind::Player, self.id)
    }

    fn aggregation_query(&self) -> AggregationQuery {
        AggregationQuery::player(self.id)
    }
}

impl Aggregatable for Team {
    fn empty_aggregate(&self) -> AggregatedRecord {
        AggregatedRecord::empty(self.id, self.name.clone())
    }

    fn cache_key(&self) -> String {
        cache_key(EntityKind::Team, self.id)
    }

    fn aggregation_query(&self) -> AggregationQuery {
        AggregationQuery::team(self.id)
    }
}
