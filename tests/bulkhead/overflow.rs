use campus_resilience_bulkhead::{BulkheadError, RejectionReason, TaskError, TaskQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A queue with one busy slot held open until `gate` is notified.
fn blocked_queue(max_queue_size: usize) -> (TaskQueue, Arc<Notify>) {
    let queue = TaskQueue::builder()
        .name("uploads")
        .concurrency(1)
        .max_queue_size(max_queue_size)
        .build();
    let gate = Arc::new(Notify::new());
    let g = Arc::clone(&gate);
    let _busy = queue
        .enqueue(move || async move {
            g.notified().await;
            Ok::<_, ()>(())
        })
        .unwrap();
    (queue, gate)
}

#[tokio::test]
async fn rejects_once_the_queue_is_full() {
    let (queue, gate) = blocked_queue(3);
    for _ in 0..3 {
        queue.enqueue(|| async { Ok::<_, ()>(()) }).unwrap();
    }
    assert!(queue.is_overloaded());

    let err = queue.enqueue(|| async { Ok::<_, ()>(()) }).unwrap_err();
    assert_eq!(
        err,
        BulkheadError::QueueOverflow {
            service: "uploads".into(),
            max_queue_size: 3,
        }
    );
    assert_eq!(queue.size(), 3);
    gate.notify_one();
}

#[tokio::test]
async fn zero_sized_queue_rejects_while_busy() {
    let (queue, gate) = blocked_queue(0);
    assert!(queue.enqueue(|| async { Ok::<_, ()>(()) }).is_err());
    gate.notify_one();
}

#[tokio::test]
async fn idle_zero_sized_queue_starts_work_immediately() {
    let queue = TaskQueue::builder()
        .name("uploads")
        .concurrency(2)
        .max_queue_size(0)
        .build();
    assert!(!queue.is_overloaded());

    let first = queue.enqueue(|| async { Ok::<_, ()>(1) }).unwrap();
    let second = queue.enqueue(|| async { Ok::<_, ()>(2) }).unwrap();
    assert_eq!(queue.running(), 2);
    assert!(queue.is_overloaded());
    assert!(queue.enqueue(|| async { Ok::<_, ()>(3) }).unwrap_err().is_rejection());

    assert_eq!(first.await, Ok(1));
    assert_eq!(second.await, Ok(2));
}

#[tokio::test]
async fn rejection_listener_sees_reason() {
    let full = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&full);
    let queue = TaskQueue::builder()
        .concurrency(1)
        .max_queue_size(0)
        .on_task_rejected(move |reason| {
            if reason == RejectionReason::QueueFull {
                f.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    let gate = Arc::new(Notify::new());
    let g = Arc::clone(&gate);
    let _busy = queue
        .enqueue(move || async move {
            g.notified().await;
            Ok::<_, ()>(())
        })
        .unwrap();
    let _ = queue.enqueue(|| async { Ok::<_, ()>(()) });
    let _ = queue.enqueue(|| async { Ok::<_, ()>(()) });

    assert_eq!(full.load(Ordering::SeqCst), 2);
    gate.notify_one();
}

#[tokio::test]
async fn shutdown_drops_pending_but_finishes_running() {
    let (queue, gate) = blocked_queue(10);
    let pending: Vec<_> = (0..3)
        .map(|_| queue.enqueue(|| async { Ok::<_, ()>(()) }).unwrap())
        .collect();

    queue.shutdown();
    assert_eq!(queue.size(), 0);
    assert_eq!(queue.running(), 1);

    for handle in pending {
        assert_eq!(
            handle.await,
            Err(TaskError::Bulkhead(BulkheadError::QueueClosed {
                service: "uploads".into()
            }))
        );
    }

    let err = queue.enqueue(|| async { Ok::<_, ()>(()) }).unwrap_err();
    assert_eq!(err.rejection().unwrap().error, "Service temporarily unavailable");

    gate.notify_one();
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let shutdowns = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&shutdowns);
    let queue = TaskQueue::builder()
        .on_event(move |event| {
            if matches!(event, campus_resilience_bulkhead::BulkheadEvent::QueueShutdown { .. }) {
                s.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    queue.shutdown();
    queue.shutdown();
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}
