use campus_resilience_circuitbreaker::{CircuitBreaker, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::advance;

fn tripped(success_threshold: usize) -> CircuitBreaker {
    let cb = CircuitBreaker::builder()
        .name("half-open")
        .failure_threshold(2)
        .success_threshold(success_threshold)
        .timeout(Duration::from_millis(500))
        .build();
    cb.on_failure();
    cb.on_failure();
    cb
}

#[tokio::test(start_paused = true)]
async fn stays_open_until_cooldown_elapses() {
    let cb = tripped(1);
    advance(Duration::from_millis(499)).await;
    assert!(!cb.can_request());
    assert_eq!(cb.state(), CircuitState::Open);

    advance(Duration::from_millis(1)).await;
    assert!(cb.can_request());
    assert_eq!(cb.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn transition_to_half_open_happens_once() {
    let transitions = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&transitions);
    let cb = CircuitBreaker::builder()
        .failure_threshold(1)
        .timeout(Duration::from_millis(100))
        .on_state_transition(move |_, to| {
            if to == CircuitState::HalfOpen {
                t.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();
    cb.on_failure();

    advance(Duration::from_millis(100)).await;
    assert!(cb.can_request());
    assert!(cb.can_request());
    assert_eq!(transitions.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn closes_after_success_threshold_with_zeroed_counters() {
    let cb = tripped(3);
    advance(Duration::from_millis(500)).await;
    assert!(cb.can_request());

    cb.on_success();
    cb.on_success();
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    cb.on_success();

    let status = cb.status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
    assert_eq!(status.success_count, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_trial_call_reopens_with_fresh_cooldown() {
    let cb = tripped(2);
    advance(Duration::from_millis(500)).await;
    assert!(cb.can_request());
    cb.on_success();

    cb.on_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(!cb.can_request());

    advance(Duration::from_millis(499)).await;
    assert!(!cb.can_request());
    advance(Duration::from_millis(1)).await;
    assert!(cb.can_request());
}

#[tokio::test(start_paused = true)]
async fn trial_call_through_execute_recovers_the_dependency() {
    let cb = tripped(1);
    advance(Duration::from_millis(500)).await;

    let body = cb
        .execute(|| async { Ok::<_, ()>("fresh") }, || async { "stale" })
        .await;
    assert_eq!(body, "fresh");
    assert_eq!(cb.state(), CircuitState::Closed);
}
