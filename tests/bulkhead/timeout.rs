use campus_resilience_bulkhead::{BulkheadError, TaskError, TaskQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn slow_task_times_out_with_configured_duration() {
    let queue = TaskQueue::builder()
        .name("auth")
        .timeout(Duration::from_secs(5))
        .build();

    let handle = queue
        .enqueue(|| async {
            tokio::time::sleep(Duration::from_secs(6)).await;
            Ok::<_, ()>(())
        })
        .unwrap();

    assert_eq!(
        handle.await,
        Err(TaskError::Bulkhead(BulkheadError::TaskTimeout {
            service: "auth".into(),
            timeout: Duration::from_secs(5),
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn task_finishing_before_timeout_succeeds() {
    let queue = TaskQueue::builder()
        .timeout(Duration::from_millis(100))
        .build();
    let handle = queue
        .enqueue(|| async {
            tokio::time::sleep(Duration::from_millis(99)).await;
            Ok::<_, ()>("in time")
        })
        .unwrap();
    assert_eq!(handle.await, Ok("in time"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_slot_is_reused() {
    let queue = TaskQueue::builder()
        .concurrency(1)
        .timeout(Duration::from_millis(100))
        .build();

    let stuck = queue
        .enqueue(|| futures::future::pending::<Result<(), ()>>())
        .unwrap();
    let next = queue.enqueue(|| async { Ok::<_, ()>(1) }).unwrap();

    assert!(stuck.await.unwrap_err().is_timeout());
    assert_eq!(next.await, Ok(1));
}

#[tokio::test(start_paused = true)]
async fn timeout_listener_fires_once_per_task() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&timeouts);
    let queue = TaskQueue::builder()
        .concurrency(2)
        .timeout(Duration::from_millis(10))
        .on_task_timeout(move |timeout| {
            assert_eq!(timeout, Duration::from_millis(10));
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            queue
                .enqueue(|| futures::future::pending::<Result<(), ()>>())
                .unwrap()
        })
        .collect();
    futures::future::join_all(handles).await;

    assert_eq!(timeouts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_does_not_cancel_the_task() {
    let done = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&done);
    let queue = TaskQueue::builder().build();

    drop(
        queue
            .enqueue(move || async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                d.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            })
            .unwrap(),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(done.load(Ordering::SeqCst), 1);
}
