use campus_resilience_bulkhead::{
    BulkheadManager, BulkheadSettings, QueueHealth, ServiceLimits, DEFAULT_MAX_QUEUE_SIZE,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

#[test]
fn default_table_matches_service_limits() {
    let manager = BulkheadManager::default();
    let expect = [
        ("auth", 5, Duration::from_secs(5)),
        ("media", 3, Duration::from_secs(30)),
        ("analytics", 2, Duration::from_secs(10)),
        ("default", 10, Duration::from_secs(10)),
    ];
    for (service, concurrency, timeout) in expect {
        let queue = manager.get_queue(service);
        assert_eq!(queue.name(), service);
        assert_eq!(queue.concurrency(), concurrency);
        assert_eq!(queue.config().timeout(), timeout);
        assert_eq!(queue.config().max_queue_size(), DEFAULT_MAX_QUEUE_SIZE);
    }
}

#[tokio::test]
async fn services_are_isolated() {
    let manager = BulkheadManager::default();
    let gate = Arc::new(Semaphore::new(0));

    let mut busy = Vec::new();
    for _ in 0..2 {
        let g = Arc::clone(&gate);
        busy.push(
            manager
                .get_queue("analytics")
                .enqueue(move || async move {
                    let _permit = g.acquire().await;
                    Ok::<_, ()>(())
                })
                .unwrap(),
        );
    }
    assert_eq!(manager.get_queue("analytics").running(), 2);

    // A saturated analytics queue does not hold up logins.
    let login = manager
        .get_queue("auth")
        .enqueue(|| async { Ok::<_, ()>("token") })
        .unwrap();
    assert_eq!(login.await, Ok("token"));

    gate.add_permits(2);
    for handle in busy {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn health_reports_running_and_queued() {
    let manager = BulkheadManager::new(
        BulkheadSettings::empty().service("media", ServiceLimits::new(1, Duration::from_secs(30))),
    );
    let gate = Arc::new(Notify::new());
    let g = Arc::clone(&gate);
    let running = manager
        .get_queue("media")
        .enqueue(move || async move {
            g.notified().await;
            Ok::<_, ()>(())
        })
        .unwrap();
    let queued = manager
        .get_queue("media")
        .enqueue(|| async { Ok::<_, ()>(()) })
        .unwrap();

    let health = manager.health();
    assert_eq!(
        health["media"],
        QueueHealth {
            running: 1,
            queued: 1,
            concurrency: 1
        }
    );
    assert_eq!(health["default"].running, 0);

    let json = serde_json::to_value(&health).unwrap();
    assert_eq!(json["media"]["queued"], 1);

    gate.notify_one();
    running.await.unwrap();
    queued.await.unwrap();
}

#[test]
fn settings_load_from_json() {
    let settings: BulkheadSettings = serde_json::from_str(
        r#"{
            "auth": { "concurrency": 8, "timeout_ms": 2000 },
            "messaging": { "concurrency": 4, "timeout_ms": 15000, "max_queue_size": 50 }
        }"#,
    )
    .unwrap();
    let manager = BulkheadManager::new(settings);

    assert_eq!(manager.get_queue("auth").concurrency(), 8);
    assert_eq!(manager.get_queue("messaging").config().max_queue_size(), 50);
    // Not in the file, so it falls back to the default queue.
    assert_eq!(manager.get_queue("media").name(), "default");
}

#[tokio::test]
async fn shutdown_all_rejects_everywhere() {
    let manager = BulkheadManager::default();
    manager.shutdown_all();
    for service in ["auth", "media", "analytics", "unknown"] {
        let err = manager
            .get_queue(service)
            .enqueue(|| async { Ok::<_, ()>(()) })
            .unwrap_err();
        assert!(err.is_rejection());
    }
}
