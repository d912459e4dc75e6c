use crate::events::{BulkheadEvent, RejectionReason};
use crate::TaskQueue;
use campus_resilience_core::{EventListeners, FnListener};
use std::collections::BTreeMap;
use std::time::Duration;

/// Pending tasks a queue holds before refusing new work.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Configuration for a single task queue.
#[derive(Clone)]
pub struct TaskQueueConfig {
    pub(crate) name: String,
    pub(crate) concurrency: usize,
    pub(crate) timeout: Duration,
    pub(crate) max_queue_size: usize,
    pub(crate) cancel_on_timeout: bool,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl TaskQueueConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TaskQueueConfigBuilder {
        TaskQueueConfigBuilder::new()
    }

    /// Queue name, usually the service it isolates.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of tasks running at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Per-task timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maximum number of pending tasks.
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Whether a timed-out task is dropped.
    pub fn cancel_on_timeout(&self) -> bool {
        self.cancel_on_timeout
    }
}

impl std::fmt::Debug for TaskQueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueueConfig")
            .field("name", &self.name)
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .field("max_queue_size", &self.max_queue_size)
            .field("cancel_on_timeout", &self.cancel_on_timeout)
            .finish()
    }
}

/// Builder for [`TaskQueueConfig`].
#[derive(Clone)]
pub struct TaskQueueConfigBuilder {
    name: String,
    concurrency: usize,
    timeout: Duration,
    max_queue_size: usize,
    cancel_on_timeout: bool,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl TaskQueueConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            concurrency: 10,
            timeout: Duration::from_secs(10),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            cancel_on_timeout: true,
            event_listeners: EventListeners::new(),
        }
    }

    /// Give this queue a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Sets the maximum number of tasks running at once.
    ///
    /// Values below 1 are treated as 1. Default: 10
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Sets how long a running task may take before it is timed out.
    ///
    /// Default: 10 seconds
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Sets how many tasks may wait for a slot.
    ///
    /// Default: 100
    pub fn max_queue_size(mut self, n: usize) -> Self {
        self.max_queue_size = n;
        self
    }

    /// Controls whether a timed-out task is dropped.
    ///
    /// With `false` the task keeps running detached after its slot is
    /// released; only the caller stops waiting. Default: `true`
    pub fn cancel_on_timeout(mut self, cancel: bool) -> Self {
        self.cancel_on_timeout = cancel;
        self
    }

    /// Registers a callback invoked with the run time of a task that
    /// returned an error or panicked.
    pub fn on_task_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if let BulkheadEvent::TaskFailed { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Registers a callback invoked with the configured timeout when a task
    /// times out.
    pub fn on_task_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if let BulkheadEvent::TaskTimedOut { timeout, .. } = event {
                    f(*timeout);
                }
            }));
        self
    }

    /// Registers a callback invoked when a task is refused at admission.
    pub fn on_task_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(RejectionReason) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if let BulkheadEvent::TaskRejected { reason, .. } = event {
                    f(*reason);
                }
            }));
        self
    }

    /// Registers a listener for every queue event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&BulkheadEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Finishes configuration without starting a queue.
    pub fn into_config(self) -> TaskQueueConfig {
        TaskQueueConfig {
            name: self.name,
            concurrency: self.concurrency,
            timeout: self.timeout,
            max_queue_size: self.max_queue_size,
            cancel_on_timeout: self.cancel_on_timeout,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the task queue.
    pub fn build(self) -> TaskQueue {
        TaskQueue::new(self.into_config())
    }
}

impl Default for TaskQueueConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Limits for one service in a [`BulkheadSettings`] table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceLimits {
    /// Maximum number of tasks running at once.
    pub concurrency: usize,
    /// Per-task timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of pending tasks.
    #[cfg_attr(feature = "serde", serde(default = "default_max_queue_size"))]
    pub max_queue_size: usize,
}

#[cfg(feature = "serde")]
fn default_max_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

impl ServiceLimits {
    /// Limits with the default queue size.
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            concurrency,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }

    /// Overrides the queue size.
    pub fn with_max_queue_size(mut self, n: usize) -> Self {
        self.max_queue_size = n;
        self
    }

    /// Per-task timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn apply(&self, builder: TaskQueueConfigBuilder) -> TaskQueueConfigBuilder {
        builder
            .concurrency(self.concurrency)
            .timeout(self.timeout())
            .max_queue_size(self.max_queue_size)
    }
}

/// Per-service bulkhead limits, keyed by service name.
///
/// Deserializes from a plain map (feature `serde`):
///
/// ```json
/// { "auth": { "concurrency": 5, "timeout_ms": 5000 } }
/// ```
///
/// A `default` entry is added by [`BulkheadManager`](crate::BulkheadManager)
/// when the table does not contain one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BulkheadSettings {
    services: BTreeMap<String, ServiceLimits>,
}

impl BulkheadSettings {
    /// Name of the fallback queue.
    pub const DEFAULT_SERVICE: &'static str = "default";

    /// An empty table. The manager still creates the `default` queue.
    pub fn empty() -> Self {
        Self {
            services: BTreeMap::new(),
        }
    }

    /// Adds or replaces the limits for `service`.
    pub fn service<N: Into<String>>(mut self, service: N, limits: ServiceLimits) -> Self {
        self.services.insert(service.into(), limits);
        self
    }

    /// Limits for `service`, if configured.
    pub fn get(&self, service: &str) -> Option<&ServiceLimits> {
        self.services.get(service)
    }

    /// Iterates over every configured service.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceLimits)> {
        self.services.iter().map(|(name, limits)| (name.as_str(), limits))
    }

    /// Number of configured services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if no service is configured.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub(crate) fn default_limits() -> ServiceLimits {
        ServiceLimits::new(10, Duration::from_secs(10))
    }
}

impl Default for BulkheadSettings {
    fn default() -> Self {
        Self::empty()
            .service("auth", ServiceLimits::new(5, Duration::from_secs(5)))
            .service("media", ServiceLimits::new(3, Duration::from_secs(30)))
            .service("analytics", ServiceLimits::new(2, Duration::from_secs(10)))
            .service(Self::DEFAULT_SERVICE, Self::default_limits())
    }
}
