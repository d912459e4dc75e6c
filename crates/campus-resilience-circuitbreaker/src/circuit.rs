use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed,
    /// The circuit is open and calls are rejected until the cooldown elapses.
    Open,
    /// The circuit is probing recovery; calls are allowed and any failure reopens it.
    HalfOpen,
}

impl CircuitState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a breaker.
///
/// Instants are taken from tokio's clock, so they follow a paused test clock.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerStatus {
    /// Breaker name.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded since the breaker last closed (or last success while closed).
    pub failure_count: usize,
    /// Successes recorded during the current half-open phase.
    pub success_count: usize,
    /// When the most recent failure was recorded.
    pub last_failure_time: Option<Instant>,
    /// When an open breaker will admit its next trial call.
    pub next_attempt: Option<Instant>,
    /// Consecutive failures that open the breaker.
    pub failure_threshold: usize,
    /// Half-open successes that close the breaker.
    pub success_threshold: usize,
    /// Cooldown spent in the open state.
    pub timeout: Duration,
}

impl CircuitBreakerStatus {
    /// Returns "healthy" when closed, "degraded" when half-open, "unhealthy" when open.
    pub fn health_status(&self) -> &'static str {
        match self.state {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    /// Returns the HTTP status class a health endpoint should report.
    pub fn http_status(&self) -> u16 {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => 200,
            CircuitState::Open => 503,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CircuitBreakerStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let now = Instant::now();
        let last_failure_ms_ago = self
            .last_failure_time
            .map(|t| now.saturating_duration_since(t).as_millis() as u64);
        let next_attempt_in_ms = self
            .next_attempt
            .map(|t| t.saturating_duration_since(now).as_millis() as u64);

        let mut s = serializer.serialize_struct("CircuitBreakerStatus", 9)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("state", &self.state)?;
        s.serialize_field("failure_count", &self.failure_count)?;
        s.serialize_field("success_count", &self.success_count)?;
        s.serialize_field("last_failure_ms_ago", &last_failure_ms_ago)?;
        s.serialize_field("next_attempt_in_ms", &next_attempt_in_ms)?;
        s.serialize_field("failure_threshold", &self.failure_threshold)?;
        s.serialize_field("success_threshold", &self.success_threshold)?;
        s.serialize_field("timeout_ms", &(self.timeout.as_millis() as u64))?;
        s.end()
    }
}

/// The breaker's state machine. Callers hold the breaker's lock for each step.
///
/// Events are buffered and handed out by [`Circuit::take_events`], so
/// listeners run after the lock is released.
pub(crate) struct Circuit {
    state: CircuitState,
    failure_count: usize,
    success_count: usize,
    last_failure_time: Option<Instant>,
    next_attempt: Option<Instant>,
    events: Vec<CircuitBreakerEvent>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt: None,
            events: Vec::new(),
        }
    }

    /// Drains the events recorded since the last call.
    pub(crate) fn take_events(&mut self) -> Vec<CircuitBreakerEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn status(&self, config: &CircuitBreakerConfig) -> CircuitBreakerStatus {
        CircuitBreakerStatus {
            name: config.name.clone(),
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            last_failure_time: self.last_failure_time,
            next_attempt: self.next_attempt,
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            timeout: config.timeout,
        }
    }

    /// Decides whether a call may proceed. Leaving `Open` happens only here.
    pub(crate) fn can_request(&mut self, config: &CircuitBreakerConfig, now: Instant) -> bool {
        let permitted = match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = self.next_attempt.is_none_or(|at| now >= at);
                if cooled_down {
                    self.success_count = 0;
                    self.transition_to(CircuitState::HalfOpen, config);
                }
                cooled_down
            }
        };

        if permitted {
            self.events.push(CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });
        } else {
            self.events.push(CircuitBreakerEvent::CallRejected {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
            });

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected")
                .increment(1);
        }

        permitted
    }

    pub(crate) fn on_success(&mut self, config: &CircuitBreakerConfig) {
        self.events.push(CircuitBreakerEvent::SuccessRecorded {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success")
            .increment(1);

        match self.state {
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.close(config);
                }
            }
            // Successful traffic forgives earlier failures.
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    pub(crate) fn on_failure(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.failure_count += 1;
        self.last_failure_time = Some(now);

        self.events.push(CircuitBreakerEvent::FailureRecorded {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
            failure_count: self.failure_count,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure")
            .increment(1);

        let should_open = match self.state {
            CircuitState::Closed => self.failure_count >= config.failure_threshold,
            // A failed trial call reopens immediately.
            CircuitState::HalfOpen => true,
            // Late completion of a call admitted before the breaker opened.
            CircuitState::Open => false,
        };

        if should_open {
            self.open(config, now);
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.open(config, now);
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.close(config);
        self.last_failure_time = None;
    }

    fn open(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.next_attempt = Some(now + config.timeout);
        self.success_count = 0;
        self.transition_to(CircuitState::Open, config);
    }

    fn close(&mut self, config: &CircuitBreakerConfig) {
        self.failure_count = 0;
        self.success_count = 0;
        self.next_attempt = None;
        self.transition_to(CircuitState::Closed, config);
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;
        self.state = state;

        self.events.push(CircuitBreakerEvent::StateTransition {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = %from_state, to = %state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            for candidate in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
                let value = if candidate == state { 1.0 } else { 0.0 };
                gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone(), "state" => candidate.as_str())
                    .set(value);
            }
        }
    }
}
