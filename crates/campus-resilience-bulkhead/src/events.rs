use campus_resilience_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Why a task was refused at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The pending queue was full.
    QueueFull,
    /// The queue had been shut down.
    Closed,
}

/// Events emitted by a task queue.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A task was appended to the pending queue.
    TaskQueued {
        pattern_name: String,
        timestamp: Instant,
        queue_depth: usize,
    },
    /// A task left the queue and started running.
    TaskStarted {
        pattern_name: String,
        timestamp: Instant,
        running: usize,
        waited: Duration,
    },
    /// A task completed with a value.
    TaskFinished {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A task returned an error or panicked.
    TaskFailed {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A task was still running when the queue timeout elapsed.
    TaskTimedOut {
        pattern_name: String,
        timestamp: Instant,
        timeout: Duration,
    },
    /// A task was refused at admission.
    TaskRejected {
        pattern_name: String,
        timestamp: Instant,
        reason: RejectionReason,
    },
    /// The queue was closed; `dropped` pending tasks were discarded.
    QueueShutdown {
        pattern_name: String,
        timestamp: Instant,
        dropped: usize,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::TaskQueued { .. } => "task_queued",
            BulkheadEvent::TaskStarted { .. } => "task_started",
            BulkheadEvent::TaskFinished { .. } => "task_finished",
            BulkheadEvent::TaskFailed { .. } => "task_failed",
            BulkheadEvent::TaskTimedOut { .. } => "task_timed_out",
            BulkheadEvent::TaskRejected { .. } => "task_rejected",
            BulkheadEvent::QueueShutdown { .. } => "queue_shutdown",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::TaskQueued { timestamp, .. }
            | BulkheadEvent::TaskStarted { timestamp, .. }
            | BulkheadEvent::TaskFinished { timestamp, .. }
            | BulkheadEvent::TaskFailed { timestamp, .. }
            | BulkheadEvent::TaskTimedOut { timestamp, .. }
            | BulkheadEvent::TaskRejected { timestamp, .. }
            | BulkheadEvent::QueueShutdown { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BulkheadEvent::TaskQueued { pattern_name, .. }
            | BulkheadEvent::TaskStarted { pattern_name, .. }
            | BulkheadEvent::TaskFinished { pattern_name, .. }
            | BulkheadEvent::TaskFailed { pattern_name, .. }
            | BulkheadEvent::TaskTimedOut { pattern_name, .. }
            | BulkheadEvent::TaskRejected { pattern_name, .. }
            | BulkheadEvent::QueueShutdown { pattern_name, .. } => pattern_name,
        }
    }
}
