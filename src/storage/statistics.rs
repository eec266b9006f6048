// src/storage/statistics.rs
//! Metrics sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Counter names reported by the ticket services.
pub const STAT_TICKETS_ISSUED: &str = "tickets_issued";
pub const STAT_TICKETS_REVOKED: &str = "tickets_revoked";
pub const STAT_ATTRIBUTE_LOOKUPS: &str = "attribute_lookups";
pub const STAT_ATTRIBUTE_LOOKUP_TIME_US: &str = "attribute_lookup_time_total_us";

/// Sink for named counters.
pub trait Statistics: Send + Sync {
    fn update(&self, name: &str, delta: i64);

    /// Current value of a counter; sinks that do not keep values return 0.
    fn get(&self, _name: &str) -> i64 {
        0
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatistics;

impl Statistics for NoopStatistics {
    fn update(&self, _name: &str, _delta: i64) {}
}

/// Keeps counters in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStatistics {
    counters: Arc<Mutex<HashMap<String, i64>>>,
}

impl MemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Statistics for MemoryStatistics {
    fn update(&self, name: &str, delta: i64) {
        // A poisoned counter map only loses metrics
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0) += delta;
        }
    }

    fn get(&self, name: &str) -> i64 {
        self.counters
            .lock()
            .map(|counters| counters.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_statistics_accumulate() {
        let stats = MemoryStatistics::new();
        stats.update(STAT_ATTRIBUTE_LOOKUPS, 1);
        stats.update(STAT_ATTRIBUTE_LOOKUPS, 2);
        assert_eq!(stats.get(STAT_ATTRIBUTE_LOOKUPS), 3);
        assert_eq!(stats.get(STAT_TICKETS_ISSUED), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = MemoryStatistics::new();
        let clone = stats.clone();
        clone.update(STAT_TICKETS_ISSUED, 1);
        assert_eq!(stats.get(STAT_TICKETS_ISSUED), 1);
    }

    #[test]
    fn test_noop_reports_zero() {
        let stats = NoopStatistics;
        stats.update(STAT_TICKETS_REVOKED, 5);
        assert_eq!(stats.get(STAT_TICKETS_REVOKED), 0);
    }
}
