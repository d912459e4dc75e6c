//! Bulkhead isolation for per-service work.
//!
//! A [`TaskQueue`] caps how many tasks of one service run at once and how
//! many may wait, so a slow dependency in one service cannot exhaust the
//! resources the others need. [`BulkheadManager`] owns one queue per service
//! and hands out [`AdmissionLayer`]s that refuse work up front when a queue
//! is full or closed.
//!
//! ## Basic Example
//!
//! ```rust
//! use campus_resilience_bulkhead::{TaskError, TaskQueue};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let thumbnails = TaskQueue::builder()
//!     .name("media")
//!     .concurrency(3)
//!     .timeout(Duration::from_secs(30))
//!     .on_task_timeout(|timeout| eprintln!("resize exceeded {timeout:?}"))
//!     .build();
//!
//! let handle = thumbnails
//!     .enqueue(|| async { Ok::<_, std::io::Error>("thumb.webp") })
//!     .expect("queue has room");
//!
//! match handle.await {
//!     Ok(path) => println!("wrote {path}"),
//!     Err(TaskError::Failed(e)) => eprintln!("resize failed: {e}"),
//!     Err(TaskError::Bulkhead(e)) => eprintln!("{e}"),
//! }
//! # }
//! ```
//!
//! ## Timeouts
//!
//! A task still running when the queue timeout elapses is dropped and its
//! handle resolves to [`BulkheadError::TaskTimeout`]. Use
//! [`TaskQueueConfigBuilder::cancel_on_timeout`] with `false` to let it run
//! on detached instead; its slot is released either way.
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate
//! - `serde`: enables loading [`BulkheadSettings`] and serializing health snapshots

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

pub use config::{
    BulkheadSettings, ServiceLimits, TaskQueueConfig, TaskQueueConfigBuilder,
    DEFAULT_MAX_QUEUE_SIZE,
};
pub use error::{BulkheadError, Rejection, TaskError};
pub use events::{BulkheadEvent, RejectionReason};
pub use layer::{Admission, AdmissionLayer};
pub use manager::{BulkheadManager, QueueHealth};
pub use queue::{TaskHandle, TaskQueue};

mod config;
mod error;
mod events;
mod layer;
mod manager;
mod queue;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "bulkhead_tasks_total",
            "Total number of bulkhead tasks by outcome (queued, started, finished, failed, timeout, rejected)"
        );
        describe_gauge!(
            "bulkhead_running_tasks",
            "Number of tasks currently running in the queue"
        );
        describe_gauge!(
            "bulkhead_queue_depth",
            "Number of tasks waiting for a slot"
        );
    });
}
