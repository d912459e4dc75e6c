//! Circuit breaker for outbound dependencies.
//!
//! A circuit breaker stops issuing calls to a failing dependency until a
//! cooldown elapses, then tests for recovery.
//!
//! ## States
//! - **Closed**: calls pass through; `failure_threshold` consecutive failures open the circuit
//! - **Open**: calls are rejected (the fallback answers) until `timeout` elapses
//! - **Half-Open**: calls pass through as trial calls; `success_threshold` successes close
//!   the circuit and any failure reopens it
//!
//! ## Usage
//!
//! ```rust
//! use campus_resilience_circuitbreaker::CircuitBreakerRegistry;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breakers = CircuitBreakerRegistry::new();
//! breakers.get_breaker_with("email", |b| {
//!     b.failure_threshold(3).success_threshold(2).timeout(Duration::from_secs(5))
//! });
//!
//! let sent = breakers
//!     .execute(
//!         "email",
//!         || async { Err::<bool, &str>("smtp unreachable") },
//!         || async { false },
//!     )
//!     .await;
//! assert!(!sent);
//! # }
//! ```
//!
//! ## Without a fallback
//!
//! [`CircuitBreaker::call`] surfaces the rejection or the original error:
//!
//! ```rust
//! use campus_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerError};
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::builder().name("media-cdn").build();
//! match breaker.call(|| async { Ok::<_, std::io::Error>("thumbnail") }).await {
//!     Ok(body) => println!("{body}"),
//!     Err(CircuitBreakerError::OpenCircuit { name }) => eprintln!("{name} is open"),
//!     Err(CircuitBreakerError::Inner(e)) => eprintln!("cdn error: {e}"),
//! }
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate
//! - `serde`: enables `Serialize` for `CircuitState` and `CircuitBreakerStatus`

use crate::circuit::Circuit;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use tokio::time::Instant;

pub use circuit::{CircuitBreakerStatus, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::{BreakerService, CircuitBreakerLayer};
pub use registry::CircuitBreakerRegistry;

mod circuit;
mod config;
mod error;
mod events;
mod layer;
mod registry;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Total number of calls through the circuit breaker"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Current state of the circuit breaker"
        );
    });
}

/// A named circuit breaker.
///
/// Cloning is cheap and every clone shares the same state, so a breaker can be
/// handed to as many call sites as need it.
#[derive(Clone)]
pub struct CircuitBreaker {
    circuit: Arc<Mutex<Circuit>>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    /// Creates a breaker in the closed state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        describe_metrics();

        Self {
            circuit: Arc::new(Mutex::new(Circuit::new())),
            config: Arc::new(config),
        }
    }

    /// Returns a builder with the default thresholds.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns whether a call may proceed.
    ///
    /// An open breaker whose cooldown has elapsed moves to half-open as a side
    /// effect of this call and returns true.
    pub fn can_request(&self) -> bool {
        self.step(|circuit, config| circuit.can_request(config, Instant::now()))
    }

    /// Records a successful call.
    pub fn on_success(&self) {
        self.step(|circuit, config| circuit.on_success(config));
    }

    /// Records a failed call.
    pub fn on_failure(&self) {
        self.step(|circuit, config| circuit.on_failure(config, Instant::now()));
    }

    /// Runs `request` through the breaker, answering with `fallback` when the
    /// circuit is open or the request fails. Never returns an error.
    ///
    /// An open circuit never invokes `request`. An in-flight request is never
    /// aborted by the breaker.
    pub async fn execute<T, E, F, Fut, FB, FutB>(&self, request: F, fallback: FB) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FutB,
        FutB: Future<Output = T>,
    {
        match self.call(request).await {
            Ok(value) => value,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %self.config.name, "answering with fallback");

                fallback().await
            }
        }
    }

    /// Runs `request` through the breaker without a fallback.
    ///
    /// Returns [`CircuitBreakerError::OpenCircuit`] when rejected, or the
    /// request's own error wrapped in [`CircuitBreakerError::Inner`].
    pub async fn call<T, E, F, Fut>(&self, request: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.can_request() {
            #[cfg(feature = "tracing")]
            tracing::trace!(breaker = %self.config.name, "circuit breaker rejected call (circuit open)");

            return Err(CircuitBreakerError::OpenCircuit {
                name: self.config.name.clone(),
            });
        }

        match request().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();

                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %self.config.name, "call failed");

                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state()
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns a read-only snapshot of every field.
    pub fn status(&self) -> CircuitBreakerStatus {
        self.circuit.lock().status(&self.config)
    }

    /// Forces the circuit closed with zeroed counters.
    pub fn reset(&self) {
        self.step(|circuit, config| circuit.reset(config));
    }

    /// Forces the circuit open with a fresh cooldown.
    pub fn force_open(&self) {
        self.step(|circuit, config| circuit.force_open(config, Instant::now()));
    }

    /// Runs one state-machine step under the lock, then notifies listeners
    /// with the lock released so they may inspect the breaker.
    fn step<R>(&self, f: impl FnOnce(&mut Circuit, &CircuitBreakerConfig) -> R) -> R {
        let (result, events) = {
            let mut circuit = self.circuit.lock();
            let result = f(&mut circuit, &self.config);
            (result, circuit.take_events())
        };

        for event in &events {
            self.config.event_listeners.emit(event);
        }
        result
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish()
    }
}
