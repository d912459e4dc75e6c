use crate::config::{ConsistencyConfig, ConsistencyConfigBuilder};
use crate::error::ConsistencyError;
use crate::events::ConsistencyEvent;
use crate::stats::{ConsistencyStats, ConsistencyStatus};
use crate::{ConsistencyLevel, ConsistencyResponse};
#[cfg(feature = "metrics")]
use metrics::counter;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

struct Record<V> {
    value: V,
    version: u64,
}

struct PendingWrite<V> {
    key: String,
    value: V,
    version: u64,
    visible_at: Instant,
}

struct Data<V> {
    committed: HashMap<String, Record<V>>,
    /// Eventual writes still propagating, in version order.
    pending: Vec<PendingWrite<V>>,
    next_version: u64,
}

impl<V> Data<V> {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

struct Inner<V> {
    config: ConsistencyConfig,
    data: RwLock<Data<V>>,
    stats: ConsistencyStats,
}

/// Key/value facade where each operation picks its consistency level.
///
/// Strong writes are visible to the next read. Eventual writes become
/// visible once `propagation_delay` has elapsed; until then reads at either
/// level see the previous value. Propagation is simulated locally and
/// applied lazily by reads. A propagating write never overwrites a value
/// committed after it was issued.
///
/// Clones share the same data and counters.
pub struct ConsistencyStore<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for ConsistencyStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConsistencyStore<()> {
    /// Returns a builder with the default propagation delay.
    ///
    /// The value type is chosen by [`ConsistencyConfigBuilder::build`].
    pub fn builder() -> ConsistencyConfigBuilder {
        ConsistencyConfigBuilder::new()
    }
}

impl<V> ConsistencyStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty store.
    pub fn new(config: ConsistencyConfig) -> Self {
        #[cfg(feature = "metrics")]
        crate::describe_metrics();

        Self {
            inner: Arc::new(Inner {
                config,
                data: RwLock::new(Data {
                    committed: HashMap::new(),
                    pending: Vec::new(),
                    next_version: 0,
                }),
                stats: ConsistencyStats::default(),
            }),
        }
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &ConsistencyConfig {
        &self.inner.config
    }

    /// Commits `value` immediately.
    pub fn write_strong(&self, key: &str, value: V) -> ConsistencyResponse<V> {
        let version = {
            let mut data = self.inner.data.write();
            let version = data.bump_version();
            data.committed.insert(
                key.to_string(),
                Record {
                    value: value.clone(),
                    version,
                },
            );
            version
        };

        self.record_write(key, ConsistencyLevel::Strong, version);
        ConsistencyResponse::ok(key, value, ConsistencyLevel::Strong)
    }

    /// Returns the latest committed value.
    pub fn read_strong(&self, key: &str) -> ConsistencyResponse<V> {
        self.read(key, ConsistencyLevel::Strong)
    }

    /// Records `value` to become visible after the propagation delay.
    ///
    /// Returns success right away; the write itself is not yet readable.
    pub fn write_eventual(&self, key: &str, value: V) -> ConsistencyResponse<V> {
        let now = Instant::now();
        // Pending holds only writes issued within the last window.
        self.promote(now);
        let visible_at = now + self.inner.config.propagation_delay;
        let version = {
            let mut data = self.inner.data.write();
            let version = data.bump_version();
            data.pending.push(PendingWrite {
                key: key.to_string(),
                value: value.clone(),
                version,
                visible_at,
            });
            version
        };

        self.record_write(key, ConsistencyLevel::Eventual, version);
        ConsistencyResponse::ok(key, value, ConsistencyLevel::Eventual)
    }

    /// Returns whatever is visible now. May be stale or missing.
    pub fn read_eventual(&self, key: &str) -> ConsistencyResponse<V> {
        self.read(key, ConsistencyLevel::Eventual)
    }

    /// Reads `key` at `level`.
    pub fn read(&self, key: &str, level: ConsistencyLevel) -> ConsistencyResponse<V> {
        self.promote(Instant::now());
        self.inner.stats.record(level);

        #[cfg(feature = "metrics")]
        counter!("consistency_operations_total", "store" => self.inner.config.name.clone(), "level" => level.as_str(), "op" => "read")
            .increment(1);

        let value = self
            .inner
            .data
            .read()
            .committed
            .get(key)
            .map(|record| record.value.clone());

        match value {
            Some(value) => ConsistencyResponse::ok(key, value, level),
            None => {
                #[cfg(feature = "tracing")]
                tracing::trace!(store = %self.inner.config.name, key, %level, "read missed");

                self.emit(ConsistencyEvent::ReadMissed {
                    pattern_name: self.inner.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    key: key.to_string(),
                    level,
                });
                let err = ConsistencyError::KeyNotFound {
                    key: key.to_string(),
                };
                ConsistencyResponse::failed(key, level, &err)
            }
        }
    }

    /// Reads `key` at `level` and compares it with `expected`.
    ///
    /// A mismatch, including a miss, is recorded as a violation and returns
    /// false. The read counts as an operation like any other.
    pub fn validate_consistency(&self, key: &str, expected: &V, level: ConsistencyLevel) -> bool
    where
        V: PartialEq,
    {
        let response = self.read(key, level);
        if response.value.as_ref() == Some(expected) {
            return true;
        }

        self.inner.stats.record_violation();

        #[cfg(feature = "tracing")]
        tracing::warn!(store = %self.inner.config.name, key, %level, "consistency violation");

        #[cfg(feature = "metrics")]
        counter!("consistency_violations_total", "store" => self.inner.config.name.clone(), "level" => level.as_str())
            .increment(1);

        self.emit(ConsistencyEvent::ViolationDetected {
            pattern_name: self.inner.config.name.clone(),
            timestamp: std::time::Instant::now(),
            key: key.to_string(),
            level,
        });
        false
    }

    /// Waits until every eventual write issued so far is visible.
    pub async fn settle(&self) {
        let deadline = self
            .inner
            .data
            .read()
            .pending
            .iter()
            .map(|write| write.visible_at)
            .max();

        if let Some(deadline) = deadline {
            tokio::time::sleep_until(deadline).await;
            self.promote(deadline);
        }
    }

    /// Counter snapshot.
    pub fn consistency_status(&self) -> ConsistencyStatus {
        self.inner.stats.snapshot()
    }

    /// Zeroes every counter. Data is kept.
    pub fn reset_stats(&self) {
        self.inner.stats.reset();

        #[cfg(feature = "tracing")]
        tracing::debug!(store = %self.inner.config.name, "consistency stats reset");
    }

    /// Number of keys with a visible value.
    pub fn len(&self) -> usize {
        self.promote(Instant::now());
        self.inner.data.read().committed.len()
    }

    /// Returns true if no key has a visible value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of eventual writes not yet visible.
    pub fn pending_writes(&self) -> usize {
        self.inner.data.read().pending.len()
    }

    /// Applies every pending write whose window ended at or before `now`.
    fn promote(&self, now: Instant) {
        let data = self.inner.data.upgradable_read();
        if !data.pending.iter().any(|write| write.visible_at <= now) {
            return;
        }

        let mut data = RwLockUpgradableReadGuard::upgrade(data);
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut data.pending)
            .into_iter()
            .partition(|write| write.visible_at <= now);
        data.pending = waiting;

        let mut superseded = Vec::new();
        for write in ready {
            let newer_committed = data
                .committed
                .get(&write.key)
                .is_some_and(|record| record.version > write.version);
            if newer_committed {
                superseded.push((write.key, write.version));
                continue;
            }
            data.committed.insert(
                write.key,
                Record {
                    value: write.value,
                    version: write.version,
                },
            );
        }
        drop(data);

        for (key, version) in superseded {
            #[cfg(feature = "tracing")]
            tracing::debug!(store = %self.inner.config.name, key = %key, version, "eventual write superseded");

            self.emit(ConsistencyEvent::WriteSuperseded {
                pattern_name: self.inner.config.name.clone(),
                timestamp: std::time::Instant::now(),
                key,
                version,
            });
        }
    }

    fn record_write(&self, key: &str, level: ConsistencyLevel, version: u64) {
        self.inner.stats.record(level);

        #[cfg(feature = "tracing")]
        tracing::trace!(store = %self.inner.config.name, key, %level, version, "write accepted");

        #[cfg(feature = "metrics")]
        counter!("consistency_operations_total", "store" => self.inner.config.name.clone(), "level" => level.as_str(), "op" => "write")
            .increment(1);

        self.emit(ConsistencyEvent::WriteAccepted {
            pattern_name: self.inner.config.name.clone(),
            timestamp: std::time::Instant::now(),
            key: key.to_string(),
            level,
            version,
        });
    }

    fn emit(&self, event: ConsistencyEvent) {
        self.inner.config.event_listeners.emit(&event);
    }
}

impl<V> Default for ConsistencyStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        ConsistencyConfigBuilder::new().build()
    }
}

impl<V> std::fmt::Debug for ConsistencyStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.data.read();
        f.debug_struct("ConsistencyStore")
            .field("name", &self.inner.config.name)
            .field("keys", &data.committed.len())
            .field("pending", &data.pending.len())
            .finish()
    }
}
