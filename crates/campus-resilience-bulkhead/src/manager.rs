//! Per-service task queues.

use crate::config::{BulkheadSettings, TaskQueueConfigBuilder};
use crate::layer::AdmissionLayer;
use crate::TaskQueue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Load snapshot of one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct QueueHealth {
    /// Tasks currently running.
    pub running: usize,
    /// Tasks waiting for a slot.
    pub queued: usize,
    /// Maximum number of tasks running at once.
    pub concurrency: usize,
}

/// Owns one [`TaskQueue`] per configured service plus a `default` queue for
/// everything else.
///
/// Clones share the same queues.
///
/// ```rust
/// use campus_resilience_bulkhead::{BulkheadManager, BulkheadSettings};
///
/// # async fn example() {
/// let bulkheads = BulkheadManager::new(BulkheadSettings::default());
///
/// let avatar = bulkheads
///     .get_queue("media")
///     .enqueue(|| async { Ok::<_, std::io::Error>(vec![0u8; 16]) })
///     .expect("queue accepts work");
/// let bytes = avatar.await.expect("resize succeeded");
/// assert_eq!(bytes.len(), 16);
///
/// // Unconfigured services share the default queue.
/// assert_eq!(bulkheads.get_queue("search").name(), "default");
/// # }
/// ```
#[derive(Clone)]
pub struct BulkheadManager {
    queues: Arc<BTreeMap<String, TaskQueue>>,
    fallback: TaskQueue,
}

impl BulkheadManager {
    /// Creates one queue per entry in `settings`.
    pub fn new(settings: BulkheadSettings) -> Self {
        Self::with_queue_options(settings, |builder| builder)
    }

    /// Creates one queue per entry in `settings`, passing every queue
    /// builder through `options` first.
    ///
    /// `options` is where shared listeners go:
    ///
    /// ```rust
    /// use campus_resilience_bulkhead::{BulkheadManager, BulkheadSettings};
    ///
    /// let bulkheads = BulkheadManager::with_queue_options(BulkheadSettings::default(), |b| {
    ///     b.on_task_timeout(|timeout| eprintln!("task exceeded {timeout:?}"))
    /// });
    /// # drop(bulkheads);
    /// ```
    ///
    /// Limits from `settings` win over anything `options` sets.
    pub fn with_queue_options<F>(settings: BulkheadSettings, options: F) -> Self
    where
        F: Fn(TaskQueueConfigBuilder) -> TaskQueueConfigBuilder,
    {
        let build = |name: &str, limits: &crate::ServiceLimits| -> TaskQueue {
            limits
                .apply(options(TaskQueueConfigBuilder::new()))
                .name(name)
                .build()
        };

        let mut queues: BTreeMap<String, TaskQueue> = settings
            .iter()
            .map(|(name, limits)| (name.to_string(), build(name, limits)))
            .collect();

        let fallback = match queues.get(BulkheadSettings::DEFAULT_SERVICE) {
            Some(queue) => queue.clone(),
            None => {
                let queue = build(
                    BulkheadSettings::DEFAULT_SERVICE,
                    &BulkheadSettings::default_limits(),
                );
                queues.insert(BulkheadSettings::DEFAULT_SERVICE.to_string(), queue.clone());
                queue
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(services = queues.len(), "bulkhead queues created");

        Self {
            queues: Arc::new(queues),
            fallback,
        }
    }

    /// Returns the queue for `service`, or the `default` queue if the service
    /// is not configured.
    pub fn get_queue(&self, service: &str) -> &TaskQueue {
        self.queues.get(service).unwrap_or(&self.fallback)
    }

    /// Shuts down every queue.
    pub fn shutdown_all(&self) {
        for queue in self.queues.values() {
            queue.shutdown();
        }
    }

    /// Load snapshot of every queue, keyed by service.
    pub fn health(&self) -> BTreeMap<String, QueueHealth> {
        self.queues
            .iter()
            .map(|(name, queue)| (name.clone(), queue.health()))
            .collect()
    }

    /// Returns admission-control middleware for `service`.
    ///
    /// Work admitted through the layer runs on `get_queue(service)`. Work the
    /// queue refuses never reaches the wrapped service.
    pub fn admit(&self, service: &str) -> AdmissionLayer {
        AdmissionLayer::for_service(service, self.get_queue(service).clone())
    }

    /// Names of every queue, sorted.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }
}

impl Default for BulkheadManager {
    fn default() -> Self {
        Self::new(BulkheadSettings::default())
    }
}

impl std::fmt::Debug for BulkheadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadManager")
            .field("queues", &self.queues.keys().collect::<Vec<_>>())
            .finish()
    }
}
