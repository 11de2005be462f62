//! Statistics service counters
//!
//! Lock-free counters updated on every operation and exported as a snapshot
//! for the `/metrics` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! let metrics = ServiceMetrics::new();
//! metrics.record_cache_hit();
//! let snapshot = metrics.snapshot();
//! println!("hit rate: {:.2}", snapshot.cache_hit_rate());
//! ```

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for the statistics service
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    records_added: AtomicU64,
    records_rejected: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_read_failures: AtomicU64,
    write_back_failures: AtomicU64,
    invalidations: AtomicU64,
    invalidation_failures: AtomicU64,
    storage_queries: AtomicU64,
}

impl ServiceMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a persisted record
    pub fn record_added(&self) {
        self.records_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record rejected before persistence
    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an aggregate served from cache
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an aggregate computed from storage
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed or undecodable cache read
    pub fn record_cache_read_failure(&self) {
        self.cache_read_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed cache write-back
    pub fn record_write_back_failure(&self) {
        self.write_back_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one cache delete and whether it succeeded
    pub fn record_invalidation(&self, ok: bool) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.invalidation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an aggregation query
    pub fn record_storage_query(&self) {
        self.storage_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> ServiceMetricsSnapshot {
        ServiceMetricsSnapshot {
            records_added: self.records_added.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_read_failures: self.cache_read_failures.load(Ordering::Relaxed),
            write_back_failures: self.write_back_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            invalidation_failures: self.invalidation_failures.load(Ordering::Relaxed),
            storage_queries: self.storage_queries.load(Ordering::Relaxed),
        }
    }
}

/// Copy of the service counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceMetricsSnapshot {
    /// Records persisted
    pub records_added: u64,
    /// Records rejected before persistence
    pub records_rejected: u64,
    /// Reads served from cache
    pub cache_hits: u64,
    /// Reads computed from storage
    pub cache_misses: u64,
    /// Cache reads that failed or returned undecodable bytes
    pub cache_read_failures: u64,
    /// Aggregates that could not be cached
    pub write_back_failures: u64,
    /// Cache deletes issued
    pub invalidations: u64,
    /// Cache deletes that failed
    pub invalidation_failures: u64,
    /// Aggregation queries executed
    pub storage_queries: u64,
}

impl ServiceMetricsSnapshot {
    /// Fraction of aggregate reads served from cache
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Render in Prometheus text exposition format
    pub fn to_prometheus(&self, prefix: &str) -> String {
        let counters: [(&str, &str, u64); 9] = [
            ("records_added_total", "Records persisted", self.records_added),
            ("records_rejected_total", "Records rejected before persistence", self.records_rejected),
            ("cache_hits_total", "Aggregate reads served from cache", self.cache_hits),
            ("cache_misses_total", "Aggregate reads computed from storage", self.cache_misses),
            ("cache_read_failures_total", "Cache reads that failed or returned undecodable bytes", self.cache_read_failures),
            ("cache_write_back_failures_total", "Aggregates that could not be written back", self.write_back_failures),
            ("invalidations_total", "Cache deletes issued by record writes", self.invalidations),
            ("invalidation_failures_total", "Cache deletes that failed", self.invalidation_failures),
            ("storage_queries_total", "Aggregation queries executed", self.storage_queries),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            let _ = writeln!(output, "# HELP {prefix}_{name} {help}");
            let _ = writeln!(output, "# TYPE {prefix}_{name} counter");
            let _ = writeln!(output, "{prefix}_{name} {value}");
        }
        let _ = writeln!(output, "# HELP {prefix}_cache_hit_ratio Fraction of reads served from cache");
        let _ = writeln!(output, "# TYPE {prefix}_cache_hit_ratio gauge");
        let _ = writeln!(output, "{prefix}_cache_hit_ratio {}", self.cache_hit_rate());
        output
    }
}
