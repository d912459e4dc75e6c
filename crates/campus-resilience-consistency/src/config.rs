use crate::events::ConsistencyEvent;
use crate::{ConsistencyLevel, ConsistencyStore};
use campus_resilience_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a consistency store.
pub struct ConsistencyConfig {
    pub(crate) name: String,
    pub(crate) propagation_delay: Duration,
    pub(crate) event_listeners: EventListeners<ConsistencyEvent>,
}

impl ConsistencyConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ConsistencyConfigBuilder {
        ConsistencyConfigBuilder::new()
    }

    /// Store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How long an eventual write takes to become visible.
    pub fn propagation_delay(&self) -> Duration {
        self.propagation_delay
    }
}

/// Builder for configuring and constructing a consistency store.
pub struct ConsistencyConfigBuilder {
    name: String,
    propagation_delay: Duration,
    event_listeners: EventListeners<ConsistencyEvent>,
}

impl ConsistencyConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            propagation_delay: Duration::from_millis(100),
            event_listeners: EventListeners::new(),
        }
    }

    /// Give this store a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Sets how long an eventual write stays invisible.
    ///
    /// Default: 100 milliseconds
    pub fn propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Registers a callback invoked with the key and level of every failed
    /// validation.
    pub fn on_violation<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, ConsistencyLevel) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ConsistencyEvent| {
                if let ConsistencyEvent::ViolationDetected { key, level, .. } = event {
                    f(key, *level);
                }
            }));
        self
    }

    /// Registers a callback invoked when a read finds no value.
    pub fn on_read_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, ConsistencyLevel) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ConsistencyEvent| {
                if let ConsistencyEvent::ReadMissed { key, level, .. } = event {
                    f(key, *level);
                }
            }));
        self
    }

    /// Registers a listener for every store event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConsistencyEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Finishes configuration without creating a store.
    pub fn into_config(self) -> ConsistencyConfig {
        ConsistencyConfig {
            name: self.name,
            propagation_delay: self.propagation_delay,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds an empty store.
    pub fn build<V>(self) -> ConsistencyStore<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        ConsistencyStore::new(self.into_config())
    }
}

impl Default for ConsistencyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
