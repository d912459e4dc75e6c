//! Property tests for the consistency store.
//!
//! Invariants tested:
//! - The consistency rate is always within 0..=100 and is 100 with no operations
//! - Counters add up: strong + eventual == total
//! - A strong read always returns the last strong write

use campus_resilience_consistency::{consistency_rate, ConsistencyLevel, ConsistencyStore};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the rate is a percentage and is pure in its inputs
    #[test]
    fn rate_is_bounded(total in 0u64..=1_000_000, violations in 0u64..=1_000_000) {
        let violations = violations.min(total);
        let rate = consistency_rate(violations, total);

        prop_assert!((0.0..=100.0).contains(&rate));
        prop_assert_eq!(rate, consistency_rate(violations, total));
        if violations == 0 {
            prop_assert_eq!(rate, 100.0);
        }
        if total > 0 && violations == total {
            prop_assert_eq!(rate, 0.0);
        }
    }

    /// Property: per-level counters always sum to the total
    #[test]
    fn counters_add_up(ops in prop::collection::vec((any::<bool>(), any::<bool>(), 0u8..4), 0..60)) {
        let store = ConsistencyStore::default();
        let mut expected_strong = 0;
        let mut expected_eventual = 0;

        for (strong, write, key) in ops {
            let key = format!("k{key}");
            match (strong, write) {
                (true, true) => { store.write_strong(&key, 1u8); }
                (true, false) => { store.read_strong(&key); }
                (false, true) => { store.write_eventual(&key, 1u8); }
                (false, false) => { store.read_eventual(&key); }
            }
            if strong { expected_strong += 1 } else { expected_eventual += 1 }
        }

        let status = store.consistency_status();
        prop_assert_eq!(status.strong_consistency_count, expected_strong);
        prop_assert_eq!(status.eventual_consistency_count, expected_eventual);
        prop_assert_eq!(status.total_operations, expected_strong + expected_eventual);
        prop_assert_eq!(status.consistency_violations, 0);
    }

    /// Property: strong reads see the latest strong write
    #[test]
    fn strong_reads_see_latest_write(values in prop::collection::vec(any::<i32>(), 1..30)) {
        let store = ConsistencyStore::default();
        for value in &values {
            store.write_strong("key", *value);
            prop_assert_eq!(store.read_strong("key").value, Some(*value));
        }
        let last = values[values.len() - 1];
        prop_assert!(store.validate_consistency("key", &last, ConsistencyLevel::Strong));
    }
}
