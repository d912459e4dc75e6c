use campus_resilience_bulkhead::{BulkheadError, BulkheadManager, BulkheadSettings, ServiceLimits};
use campus_resilience_core::ResilienceError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::{BoxError, Layer, Service, ServiceExt, service_fn};

fn single_slot(max_queue_size: usize) -> BulkheadManager {
    BulkheadManager::new(BulkheadSettings::empty().service(
        "media",
        ServiceLimits::new(1, Duration::from_secs(30)).with_max_queue_size(max_queue_size),
    ))
}

#[tokio::test]
async fn overflow_is_answered_without_reaching_the_handler() {
    let manager = single_slot(0);
    let gate = Arc::new(Notify::new());
    let handled = Arc::new(AtomicUsize::new(0));

    let (g, h) = (Arc::clone(&gate), Arc::clone(&handled));
    let svc = manager.admit("media").layer(service_fn(move |_: ()| {
        let g = Arc::clone(&g);
        h.fetch_add(1, Ordering::SeqCst);
        async move {
            g.notified().await;
            Ok::<_, BoxError>("uploaded")
        }
    }));

    let first = tokio::spawn(svc.clone().oneshot(()));
    tokio::task::yield_now().await;
    assert_eq!(manager.get_queue("media").running(), 1);

    let err = svc.clone().oneshot(()).await.unwrap_err();
    let rejection = err
        .downcast_ref::<BulkheadError>()
        .and_then(BulkheadError::rejection)
        .unwrap();
    assert_eq!(rejection.error, "Service overloaded");
    assert_eq!(rejection.service, "media");
    assert_eq!(rejection.status(), 503);

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), "uploaded");
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_service_is_admitted_on_default_and_labelled_by_name() {
    let manager = BulkheadManager::default();
    manager.get_queue("default").shutdown();

    let svc = manager
        .admit("search")
        .layer(service_fn(|q: String| async move { Ok::<_, BoxError>(q) }));
    let err = svc.oneshot("rust".into()).await.unwrap_err();
    let rejection = err.downcast_ref::<BulkheadError>().unwrap().rejection().unwrap();
    assert_eq!(rejection.service, "search");
}

#[tokio::test]
async fn handler_errors_pass_through_unchanged() {
    let manager = BulkheadManager::default();
    let svc = manager.admit("auth").layer(service_fn(|_: ()| async {
        Err::<(), ResilienceError<&'static str>>(ResilienceError::Application("bad password"))
    }));

    let err = svc.oneshot(()).await.unwrap_err();
    assert_eq!(err.application_error(), Some("bad password"));
}

#[tokio::test(start_paused = true)]
async fn slow_handler_becomes_timeout_error() {
    let manager = BulkheadManager::new(
        BulkheadSettings::empty().service("auth", ServiceLimits::new(5, Duration::from_secs(5))),
    );
    let mut svc = manager.admit("auth").layer(service_fn(|_: ()| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<_, ResilienceError<std::io::Error>>(())
    }));

    let err = svc.ready().await.unwrap().call(()).await.unwrap_err();
    assert!(err.is_timeout());
}
