//! Unified error type for composed resilience layers.
//!
//! A service stacked behind both an admission layer and a circuit breaker
//! would otherwise need a hand-written `From` impl per layer error. Using
//! [`ResilienceError<E>`] as the service error removes that boilerplate: each
//! pattern crate provides the conversion from its own error into the matching
//! variant.
//!
//! ```rust
//! use campus_resilience_core::ResilienceError;
//!
//! #[derive(Debug)]
//! enum FeedError {
//!     Upstream,
//! }
//!
//! impl std::fmt::Display for FeedError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "feed upstream failed")
//!     }
//! }
//!
//! impl std::error::Error for FeedError {}
//!
//! fn describe(err: &ResilienceError<FeedError>) -> &'static str {
//!     match err {
//!         ResilienceError::CircuitOpen { .. } => "degraded",
//!         ResilienceError::QueueOverflow { .. } | ResilienceError::QueueClosed { .. } => {
//!             "unavailable"
//!         }
//!         ResilienceError::Timeout { .. } | ResilienceError::Aborted { .. } => "slow",
//!         ResilienceError::Application(_) => "failed",
//!     }
//! }
//! # let _ = describe(&ResilienceError::Application(FeedError::Upstream));
//! ```

use std::time::Duration;

/// A common error type that wraps all resilience layer errors.
///
/// # Type Parameters
///
/// - `E`: The application-specific error type from the wrapped service
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResilienceError<E> {
    /// A task exceeded its bulkhead timeout.
    #[error("task in '{service}' timed out after {timeout:?}")]
    Timeout {
        /// The service whose queue timed the task out.
        service: String,
        /// The configured per-task timeout.
        timeout: Duration,
    },

    /// Circuit breaker is open, call rejected.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Circuit breaker name.
        name: String,
    },

    /// The service's task queue is at capacity, call rejected.
    #[error("service '{service}' is overloaded ({max_queue_size} tasks queued)")]
    QueueOverflow {
        /// The service whose queue overflowed.
        service: String,
        /// Maximum number of pending tasks.
        max_queue_size: usize,
    },

    /// The service's task queue was shut down, call rejected.
    #[error("service '{service}' is shut down")]
    QueueClosed {
        /// The service whose queue is closed.
        service: String,
    },

    /// A queued task panicked or was dropped before it settled.
    #[error("task in '{service}' aborted before completing")]
    Aborted {
        /// The service whose task was lost.
        service: String,
    },

    /// The underlying application service returned an error.
    #[error("application error: {0}")]
    Application(E),
}

// From implementations for each pattern error live in the pattern crates to
// avoid circular dependencies.

impl<E> ResilienceError<E> {
    /// Returns `true` if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    /// Returns `true` if the circuit breaker rejected the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` if admission control rejected the call.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            ResilienceError::QueueOverflow { .. } | ResilienceError::QueueClosed { .. }
        )
    }

    /// Returns `true` if this is an application error.
    pub fn is_application(&self) -> bool {
        matches!(self, ResilienceError::Application(_))
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    ///
    /// ```
    /// use campus_resilience_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::Application("boom".to_string());
    /// let mapped: ResilienceError<usize> = err.map_application(|s| s.len());
    /// assert_eq!(mapped.application_error(), Some(4));
    /// ```
    pub fn map_application<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::Timeout { service, timeout } => {
                ResilienceError::Timeout { service, timeout }
            }
            ResilienceError::CircuitOpen { name } => ResilienceError::CircuitOpen { name },
            ResilienceError::QueueOverflow {
                service,
                max_queue_size,
            } => ResilienceError::QueueOverflow {
                service,
                max_queue_size,
            },
            ResilienceError::QueueClosed { service } => ResilienceError::QueueClosed { service },
            ResilienceError::Aborted { service } => ResilienceError::Aborted { service },
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}
