//! Cache Statistics Module
//!
//! Tracks cache effectiveness: hits per tier, misses, evictions and
//! durable-tier pressure relief.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served from the memory tier
    pub hits: u64,
    /// Reads served from the durable tier (and promoted into memory)
    pub durable_hits: u64,
    /// Reads that found nothing fresh in either tier
    pub misses: u64,
    /// Memory entries dropped to stay under capacity
    pub evictions: u64,
    /// Times a failed durable write triggered pressure relief
    pub pressure_reliefs: u64,
    /// Current number of entries in the memory tier
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of reads served from either tier, or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.durable_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_pressure_relief(&mut self) {
        self.pressure_reliefs += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
