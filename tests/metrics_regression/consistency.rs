//! Consistency store metrics regression tests

use super::helpers::*;
use campus_resilience_consistency::{ConsistencyLevel, ConsistencyStore};
use serial_test::serial;

#[test]
#[serial]
fn consistency_metrics_exist() {
    init_recorder();

    let store = ConsistencyStore::builder().name("metrics_store").build();
    store.write_strong("k", 1u8);
    store.write_eventual("e", 2u8);
    store.read_eventual("k");
    store.validate_consistency("k", &9, ConsistencyLevel::Strong);

    assert_counter_exists("consistency_operations_total");
    assert_metric_has_label("consistency_operations_total", "store", "metrics_store");
    assert_metric_has_label("consistency_operations_total", "level", "strong");
    assert_metric_has_label("consistency_operations_total", "level", "eventual");
    assert_metric_has_label("consistency_operations_total", "op", "write");
    assert_metric_has_label("consistency_operations_total", "op", "read");

    assert_counter_exists("consistency_violations_total");
    assert_metric_has_label("consistency_violations_total", "store", "metrics_store");
}
