//! Query counters
//!
//! - Counters only, monotonic
//! - Reset only when the registry is recreated
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for filter calls made through one engine
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Calls that returned filtered results, retried ones included
    queries_executed: AtomicU64,
    /// Calls that fell back to the unfiltered input
    queries_failed: AtomicU64,
    /// Calls re-run without their extra filters
    retries_without_extras: AtomicU64,
    /// Division-years a grade was requested for with no baseline
    baseline_misses: AtomicU64,
    /// Records returned across all calls
    records_matched: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.retries_without_extras.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_baseline_misses(&self, count: u64) {
        self.baseline_misses.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_records_matched(&self, count: u64) {
        self.records_matched.fetch_add(count, Ordering::Relaxed);
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"queries_executed":{},"queries_failed":{},"retries_without_extras":{},"baseline_misses":{},"records_matched":{}}}"#,
            s.queries_executed,
            s.queries_failed,
            s.retries_without_extras,
            s.baseline_misses,
            s.records_matched,
        )
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            retries_without_extras: self.retries_without_extras.load(Ordering::Relaxed),
            baseline_misses: self.baseline_misses.load(Ordering::Relaxed),
            records_matched: self.records_matched.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub retries_without_extras: u64,
    pub baseline_misses: u64,
    pub records_matched: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_queries_executed();
        registry.increment_queries_executed();
        registry.increment_queries_failed();
        registry.increment_retries();
        registry.add_baseline_misses(3);
        registry.add_records_matched(40);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.queries_executed, 2);
        assert_eq!(snapshot.queries_failed, 1);
        assert_eq!(snapshot.retries_without_extras, 1);
        assert_eq!(snapshot.baseline_misses, 3);
        assert_eq!(snapshot.records_matched, 40);
    }

    #[test]
    fn test_to_json_parses() {
        let registry = MetricsRegistry::new();
        registry.increment_queries_failed();
        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["queries_failed"], 1);
        assert_eq!(parsed["queries_executed"], 0);
    }
}
