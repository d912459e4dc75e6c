use crate::ConsistencyLevel;
use std::sync::atomic::{AtomicU64, Ordering};

/// Percentage of operations that were not consistency violations.
///
/// Returns 100 when no operation has been recorded.
///
/// ```rust
/// use campus_resilience_consistency::consistency_rate;
///
/// assert_eq!(consistency_rate(0, 0), 100.0);
/// assert_eq!(consistency_rate(1, 4), 75.0);
/// ```
pub fn consistency_rate(violations: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 - (violations as f64 / total as f64) * 100.0
}

/// Snapshot of a store's operation counters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConsistencyStatus {
    /// Reads and writes served at strong consistency.
    pub strong_consistency_count: u64,
    /// Reads and writes served at eventual consistency.
    pub eventual_consistency_count: u64,
    /// All recorded reads and writes.
    pub total_operations: u64,
    /// Validation checks that found a mismatch.
    pub consistency_violations: u64,
    /// See [`consistency_rate`].
    pub consistency_rate: f64,
}

#[derive(Debug, Default)]
pub(crate) struct ConsistencyStats {
    strong: AtomicU64,
    eventual: AtomicU64,
    total: AtomicU64,
    violations: AtomicU64,
}

impl ConsistencyStats {
    pub(crate) fn record(&self, level: ConsistencyLevel) {
        match level {
            ConsistencyLevel::Strong => self.strong.fetch_add(1, Ordering::Relaxed),
            ConsistencyLevel::Eventual => self.eventual.fetch_add(1, Ordering::Relaxed),
        };
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_violation(&self) {
        self.violations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.strong.store(0, Ordering::Relaxed);
        self.eventual.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
        self.violations.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ConsistencyStatus {
        let total = self.total.load(Ordering::Relaxed);
        let violations = self.violations.load(Ordering::Relaxed);
        ConsistencyStatus {
            strong_consistency_count: self.strong.load(Ordering::Relaxed),
            eventual_consistency_count: self.eventual.load(Ordering::Relaxed),
            total_operations: total,
            consistency_violations: violations,
            consistency_rate: consistency_rate(violations, total),
        }
    }
}
