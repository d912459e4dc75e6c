use campus_resilience_circuitbreaker::{CircuitBreaker, CircuitState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn breaker(failure_threshold: usize) -> CircuitBreaker {
    CircuitBreaker::builder()
        .name("thresholds")
        .failure_threshold(failure_threshold)
        .success_threshold(2)
        .timeout(Duration::from_secs(5))
        .build()
}

#[test]
fn opens_on_exactly_the_threshold() {
    let cb = breaker(4);
    for _ in 0..3 {
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
    cb.on_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(!cb.can_request());
}

#[test]
fn failures_must_be_consecutive() {
    let cb = breaker(3);
    cb.on_failure();
    cb.on_failure();
    cb.on_success();
    cb.on_failure();
    cb.on_failure();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.status().failure_count, 2);
}

#[test]
fn threshold_of_one_opens_on_first_failure() {
    let cb = breaker(1);
    cb.on_failure();
    assert!(cb.is_open());
}

#[test]
fn zero_threshold_is_clamped() {
    let cb = CircuitBreaker::builder().failure_threshold(0).build();
    assert_eq!(cb.config().failure_threshold(), 1);
    assert!(cb.can_request());
}

#[test]
fn opening_records_failure_time_and_next_attempt() {
    let cb = breaker(2);
    cb.on_failure();
    cb.on_failure();

    let status = cb.status();
    let last_failure = status.last_failure_time.unwrap();
    let next_attempt = status.next_attempt.unwrap();
    assert_eq!(next_attempt - last_failure, Duration::from_secs(5));
    assert_eq!(status.failure_count, 2);
}

#[tokio::test]
async fn open_breaker_answers_with_fallback_without_calling() {
    let cb = breaker(1);
    cb.on_failure();

    let called = AtomicBool::new(false);
    let value = cb
        .execute(
            || async {
                called.store(true, Ordering::SeqCst);
                Ok::<u8, ()>(1)
            },
            || async { 0u8 },
        )
        .await;
    assert_eq!(value, 0);
    assert!(!called.load(Ordering::SeqCst));
}
