//! Bulkhead metrics regression tests

use super::helpers::*;
use campus_resilience_bulkhead::TaskQueue;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn bulkhead_metrics_exist() {
    init_recorder();

    let queue = TaskQueue::builder()
        .name("metrics_bh")
        .concurrency(1)
        .max_queue_size(1)
        .timeout(Duration::from_secs(5))
        .build();

    let first = queue.enqueue(|| async { Ok::<_, ()>(1) }).unwrap();
    let second = queue.enqueue(|| async { Err::<u8, _>(()) }).unwrap();
    assert!(queue.enqueue(|| async { Ok::<_, ()>(3) }).is_err());

    let _ = first.await;
    let _ = second.await;

    assert_counter_exists("bulkhead_tasks_total");
    assert_metric_has_label("bulkhead_tasks_total", "queue", "metrics_bh");
    for outcome in ["queued", "started", "finished", "failed", "rejected"] {
        assert_metric_has_label("bulkhead_tasks_total", "outcome", outcome);
    }

    assert_gauge_exists("bulkhead_running_tasks");
    assert_metric_has_label("bulkhead_running_tasks", "queue", "metrics_bh");
    assert_gauge_exists("bulkhead_queue_depth");
    assert_metric_has_label("bulkhead_queue_depth", "queue", "metrics_bh");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn bulkhead_timeout_is_labelled() {
    init_recorder();

    let queue = TaskQueue::builder()
        .name("metrics_bh_timeout")
        .timeout(Duration::from_millis(10))
        .build();
    let handle = queue
        .enqueue(|| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, ()>(())
        })
        .unwrap();
    assert!(handle.await.unwrap_err().is_timeout());

    assert_metric_has_label("bulkhead_tasks_total", "queue", "metrics_bh_timeout");
    assert_metric_has_label("bulkhead_tasks_total", "outcome", "timeout");
}
