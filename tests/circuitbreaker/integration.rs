use campus_resilience_circuitbreaker::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerLayer, CircuitState,
};
use campus_resilience_core::ResilienceError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service, ServiceBuilder, ServiceExt, service_fn};

#[tokio::test]
async fn layered_service_trips_and_rejects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let breaker = CircuitBreaker::builder()
        .name("thumbnailer")
        .failure_threshold(3)
        .build();

    let mut svc = ServiceBuilder::new()
        .layer(CircuitBreakerLayer::new(breaker.clone()))
        .service(service_fn(move |_: ()| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("resize failed") }
        }));

    for _ in 0..5 {
        let _ = svc.ready().await.unwrap().call(()).await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn layer_error_converts_into_resilience_error() {
    let breaker = CircuitBreaker::builder().failure_threshold(1).build();
    breaker.force_open();

    let svc = CircuitBreakerLayer::new(breaker).layer(service_fn(|_: ()| async {
        Ok::<_, std::io::Error>(())
    }));
    let err: ResilienceError<std::io::Error> = svc.oneshot(()).await.unwrap_err().into();
    assert!(err.is_circuit_open());
}

#[tokio::test]
async fn listeners_observe_calls() {
    let permitted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    let (p, r, f) = (
        Arc::clone(&permitted),
        Arc::clone(&rejected),
        Arc::clone(&failures),
    );

    let cb = CircuitBreaker::builder()
        .failure_threshold(2)
        .timeout(Duration::from_secs(30))
        .on_call_permitted(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        })
        .on_call_rejected(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .on_failure(move |_, count| {
            f.store(count, Ordering::SeqCst);
        })
        .build();

    for _ in 0..3 {
        let result = cb.call(|| async { Err::<(), _>(()) }).await;
        assert!(result.is_err());
    }

    assert_eq!(permitted.load(Ordering::SeqCst), 2);
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn panicking_listener_does_not_break_the_breaker() {
    let cb = CircuitBreaker::builder()
        .failure_threshold(1)
        .on_state_transition(|_, _| panic!("listener bug"))
        .build();

    let err = cb.call(|| async { Err::<(), _>("x") }).await.unwrap_err();
    assert!(matches!(err, CircuitBreakerError::Inner("x")));
    assert!(cb.is_open());
}
