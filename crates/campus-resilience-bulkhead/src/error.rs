//! Error types for the bulkhead pattern.

use campus_resilience_core::ResilienceError;
use std::time::Duration;

/// Errors produced by a task queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// The queue already holds `max_queue_size` pending tasks.
    #[error("queue '{service}' is full: {max_queue_size} tasks already pending")]
    QueueOverflow {
        /// Service the queue belongs to.
        service: String,
        /// Maximum number of pending tasks.
        max_queue_size: usize,
    },
    /// The queue was shut down.
    #[error("queue '{service}' is closed")]
    QueueClosed {
        /// Service the queue belongs to.
        service: String,
    },
    /// The task did not settle within the queue's timeout.
    #[error("task in '{service}' timed out after {timeout:?}")]
    TaskTimeout {
        /// Service the queue belongs to.
        service: String,
        /// The per-task timeout.
        timeout: Duration,
    },
    /// The task panicked or was dropped before it settled.
    #[error("task in '{service}' aborted before completing")]
    TaskAborted {
        /// Service the queue belongs to.
        service: String,
    },
}

impl BulkheadError {
    /// Returns true for admission failures (overflow or closed).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BulkheadError::QueueOverflow { .. } | BulkheadError::QueueClosed { .. }
        )
    }

    /// Returns true if the task timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BulkheadError::TaskTimeout { .. })
    }

    /// Service the error refers to.
    pub fn service(&self) -> &str {
        match self {
            BulkheadError::QueueOverflow { service, .. }
            | BulkheadError::QueueClosed { service }
            | BulkheadError::TaskTimeout { service, .. }
            | BulkheadError::TaskAborted { service } => service,
        }
    }

    /// Converts an admission failure into the structured "unavailable"
    /// response. Returns `None` for errors raised after admission.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            BulkheadError::QueueOverflow { service, .. } => Some(Rejection {
                error: Rejection::OVERLOADED,
                service: service.clone(),
                message: format!(
                    "Too many requests are waiting for the {service} service. Please retry shortly."
                ),
            }),
            BulkheadError::QueueClosed { service } => Some(Rejection {
                error: Rejection::UNAVAILABLE,
                service: service.clone(),
                message: format!("The {service} service is shutting down and not accepting requests."),
            }),
            BulkheadError::TaskTimeout { .. } | BulkheadError::TaskAborted { .. } => None,
        }
    }

    pub(crate) fn relabel(self, name: &str) -> Self {
        let service = name.to_string();
        match self {
            BulkheadError::QueueOverflow { max_queue_size, .. } => BulkheadError::QueueOverflow {
                service,
                max_queue_size,
            },
            BulkheadError::QueueClosed { .. } => BulkheadError::QueueClosed { service },
            BulkheadError::TaskTimeout { timeout, .. } => {
                BulkheadError::TaskTimeout { service, timeout }
            }
            BulkheadError::TaskAborted { .. } => BulkheadError::TaskAborted { service },
        }
    }
}

/// The body an admission boundary answers with when it refuses work.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rejection {
    /// "Service overloaded" or "Service temporarily unavailable".
    pub error: &'static str,
    /// Service that refused the work.
    pub service: String,
    /// Human-readable explanation.
    pub message: String,
}

impl Rejection {
    /// `error` value for a full queue.
    pub const OVERLOADED: &'static str = "Service overloaded";
    /// `error` value for a closed queue.
    pub const UNAVAILABLE: &'static str = "Service temporarily unavailable";

    /// HTTP status class of every rejection.
    pub fn status(&self) -> u16 {
        503
    }
}

/// Outcome of a queued task that did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError<E> {
    /// The queue refused, dropped, timed out, or lost the task.
    #[error(transparent)]
    Bulkhead(#[from] BulkheadError),
    /// The task ran and returned an error.
    #[error("task failed: {0}")]
    Failed(E),
}

impl<E> TaskError<E> {
    /// Returns true if the queue timed the task out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Bulkhead(b) if b.is_timeout())
    }

    /// Returns the task's own error if it ran and failed.
    pub fn into_failed(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            TaskError::Bulkhead(_) => None,
        }
    }
}

impl<E> From<BulkheadError> for ResilienceError<E> {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::QueueOverflow {
                service,
                max_queue_size,
            } => ResilienceError::QueueOverflow {
                service,
                max_queue_size,
            },
            BulkheadError::QueueClosed { service } => ResilienceError::QueueClosed { service },
            BulkheadError::TaskTimeout { service, timeout } => {
                ResilienceError::Timeout { service, timeout }
            }
            BulkheadError::TaskAborted { service } => ResilienceError::Aborted { service },
        }
    }
}
