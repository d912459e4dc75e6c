use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use campus_resilience_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) name: String,
    pub(crate) failure_threshold: usize,
    pub(crate) success_threshold: usize,
    pub(crate) timeout: Duration,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consecutive failures that open the breaker.
    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    /// Half-open successes that close the breaker.
    pub fn success_threshold(&self) -> usize {
        self.success_threshold
    }

    /// Cooldown spent in the open state before a trial call is admitted.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for configuring and constructing a circuit breaker.
///
/// The builder is `Clone`, which is how [`CircuitBreakerRegistry`](crate::CircuitBreakerRegistry)
/// merges per-breaker options over its defaults.
#[derive(Clone)]
pub struct CircuitBreakerConfigBuilder {
    name: String,
    failure_threshold: usize,
    success_threshold: usize,
    timeout: Duration,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(10),
            event_listeners: EventListeners::new(),
        }
    }

    /// Preset for latency-sensitive dependencies: opens after 2 failures,
    /// tries again after 5 seconds and closes on the first good call.
    pub fn fast_fail(self) -> Self {
        self.failure_threshold(2)
            .success_threshold(1)
            .timeout(Duration::from_secs(5))
    }

    /// Preset for flaky but important dependencies: tolerates 10 failures and
    /// needs 5 good trial calls after a 30 second cooldown.
    pub fn tolerant(self) -> Self {
        self.failure_threshold(10)
            .success_threshold(5)
            .timeout(Duration::from_secs(30))
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Sets how many consecutive failures open the circuit.
    ///
    /// Values below 1 are treated as 1. Default: 5
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.failure_threshold = n.max(1);
        self
    }

    /// Sets how many successful trial calls in half-open close the circuit.
    ///
    /// Values below 1 are treated as 1. Default: 3
    pub fn success_threshold(mut self, n: usize) -> Self {
        self.success_threshold = n.max(1);
        self
    }

    /// Sets how long the circuit stays open before a trial call is admitted.
    ///
    /// Default: 10 seconds
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Registers a callback invoked with `(from, to)` on every state transition.
    ///
    /// ```rust,no_run
    /// use campus_resilience_circuitbreaker::{CircuitBreaker, CircuitState};
    ///
    /// let breaker = CircuitBreaker::builder()
    ///     .name("email")
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("email dependency tripped ({from} -> {to})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback invoked with the current state when a call is permitted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when an open circuit rejects a call.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback invoked with the state in which a success was recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked with the state and running failure count
    /// whenever a failure is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded {
                    state,
                    failure_count,
                    ..
                } = event
                {
                    f(*state, *failure_count);
                }
            }));
        self
    }

    pub(crate) fn into_config(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            name: self.name,
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: self.timeout,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the breaker.
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::new(self.into_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
