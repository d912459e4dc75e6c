use campus_resilience_bulkhead::{
    AdmissionLayer, BulkheadManager, BulkheadSettings, QueueHealth, TaskQueueConfigBuilder,
};
use campus_resilience_circuitbreaker::{
    CircuitBreakerConfigBuilder, CircuitBreakerRegistry, CircuitBreakerStatus,
};
use campus_resilience_consistency::{ConsistencyConfigBuilder, ConsistencyStatus, ConsistencyStore};
use std::collections::BTreeMap;
use std::marker::PhantomData;

type QueueOptions = Box<dyn Fn(TaskQueueConfigBuilder) -> TaskQueueConfigBuilder>;

/// Combined read-only snapshot of every pattern.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthReport {
    /// Every registered breaker, keyed by name.
    pub breakers: BTreeMap<String, CircuitBreakerStatus>,
    /// Every bulkhead queue, keyed by service.
    pub bulkheads: BTreeMap<String, QueueHealth>,
    /// Consistency store counters.
    pub consistency: ConsistencyStatus,
}

/// The per-process resilience context.
///
/// Build one at startup and hand clones to request handlers; every clone
/// shares the same breakers, queues and store.
pub struct Resilience<V> {
    breakers: CircuitBreakerRegistry,
    bulkheads: BulkheadManager,
    store: ConsistencyStore<V>,
}

impl<V> Clone for Resilience<V> {
    fn clone(&self) -> Self {
        Self {
            breakers: self.breakers.clone(),
            bulkheads: self.bulkheads.clone(),
            store: self.store.clone(),
        }
    }
}

impl<V> Resilience<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns a builder using every pattern's defaults.
    pub fn builder() -> ResilienceBuilder<V> {
        ResilienceBuilder::new()
    }

    /// The circuit breaker registry.
    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// The bulkhead manager.
    pub fn bulkheads(&self) -> &BulkheadManager {
        &self.bulkheads
    }

    /// The consistency store.
    pub fn store(&self) -> &ConsistencyStore<V> {
        &self.store
    }

    /// Shorthand for `bulkheads().admit(service)`.
    pub fn admit(&self, service: &str) -> AdmissionLayer {
        self.bulkheads.admit(service)
    }

    /// Snapshot of breakers, queues and store counters.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            breakers: self.breakers.all_statuses(),
            bulkheads: self.bulkheads.health(),
            consistency: self.store.consistency_status(),
        }
    }

    /// Closes every bulkhead queue. Breakers and stored data are untouched.
    pub fn shutdown(&self) {
        self.bulkheads.shutdown_all();
    }
}

impl<V> std::fmt::Debug for Resilience<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resilience")
            .field("breakers", &self.breakers)
            .field("bulkheads", &self.bulkheads)
            .field("store", &self.store)
            .finish()
    }
}

/// Builder for [`Resilience`].
pub struct ResilienceBuilder<V> {
    breaker_defaults: CircuitBreakerConfigBuilder,
    bulkhead_settings: BulkheadSettings,
    queue_options: Option<QueueOptions>,
    consistency: ConsistencyConfigBuilder,
    _value: PhantomData<fn() -> V>,
}

impl<V> ResilienceBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder with every pattern's defaults.
    pub fn new() -> Self {
        Self {
            breaker_defaults: CircuitBreakerConfigBuilder::new(),
            bulkhead_settings: BulkheadSettings::default(),
            queue_options: None,
            consistency: ConsistencyConfigBuilder::new().name("default"),
            _value: PhantomData,
        }
    }

    /// Defaults applied to every breaker the registry creates.
    pub fn breaker_defaults(mut self, defaults: CircuitBreakerConfigBuilder) -> Self {
        self.breaker_defaults = defaults;
        self
    }

    /// Per-service bulkhead limits.
    ///
    /// Default: [`BulkheadSettings::default`]
    pub fn bulkhead_settings(mut self, settings: BulkheadSettings) -> Self {
        self.bulkhead_settings = settings;
        self
    }

    /// Options applied to every queue builder, such as shared listeners.
    pub fn queue_options<F>(mut self, options: F) -> Self
    where
        F: Fn(TaskQueueConfigBuilder) -> TaskQueueConfigBuilder + 'static,
    {
        self.queue_options = Some(Box::new(options));
        self
    }

    /// Configuration for the consistency store.
    pub fn consistency(mut self, config: ConsistencyConfigBuilder) -> Self {
        self.consistency = config;
        self
    }

    /// Builds the context.
    pub fn build(self) -> Resilience<V> {
        let bulkheads = match self.queue_options {
            Some(options) => BulkheadManager::with_queue_options(self.bulkhead_settings, options),
            None => BulkheadManager::new(self.bulkhead_settings),
        };

        Resilience {
            breakers: CircuitBreakerRegistry::with_defaults(self.breaker_defaults),
            bulkheads,
            store: self.consistency.build(),
        }
    }
}

impl<V> Default for ResilienceBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
