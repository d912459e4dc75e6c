//! Named registry of circuit breakers.

use crate::layer::CircuitBreakerLayer;
use crate::{
    CircuitBreaker, CircuitBreakerConfigBuilder, CircuitBreakerError, CircuitBreakerStatus,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

/// Owns one [`CircuitBreaker`] per dependency name.
///
/// Breakers are created lazily on first lookup and live as long as the
/// registry. Construct one registry at process start and pass clones of it to
/// every call site; clones share the same breakers.
#[derive(Clone)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
    defaults: Arc<CircuitBreakerConfigBuilder>,
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry using the stock breaker defaults.
    pub fn new() -> Self {
        Self::with_defaults(CircuitBreakerConfigBuilder::new())
    }

    /// Creates an empty registry whose breakers start from `defaults`.
    ///
    /// Listeners registered on `defaults` are attached to every breaker.
    pub fn with_defaults(defaults: CircuitBreakerConfigBuilder) -> Self {
        Self {
            breakers: Arc::new(RwLock::new(HashMap::new())),
            defaults: Arc::new(defaults),
        }
    }

    /// Returns the breaker for `name`, creating it from the defaults if needed.
    pub fn get_breaker(&self, name: &str) -> CircuitBreaker {
        self.get_breaker_with(name, |builder| builder)
    }

    /// Returns the breaker for `name`, creating it with `options` applied over
    /// the registry defaults if it does not exist yet.
    ///
    /// Options are ignored for a breaker that is already registered.
    pub fn get_breaker_with<F>(&self, name: &str, options: F) -> CircuitBreaker
    where
        F: FnOnce(CircuitBreakerConfigBuilder) -> CircuitBreakerConfigBuilder,
    {
        if let Some(existing) = self.breakers.read().get(name) {
            return existing.clone();
        }

        let mut breakers = self.breakers.write();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = name, "registering circuit breaker");

                options((*self.defaults).clone().name(name)).name(name).build()
            })
            .clone()
    }

    /// Runs `request` through the named breaker with a fallback. Never fails.
    pub async fn execute<T, E, F, Fut, FB, FutB>(&self, name: &str, request: F, fallback: FB) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FutB,
        FutB: Future<Output = T>,
    {
        self.get_breaker(name).execute(request, fallback).await
    }

    /// Runs `request` through the named breaker without a fallback.
    pub async fn call<T, E, F, Fut>(
        &self,
        name: &str,
        request: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_breaker(name).call(request).await
    }

    /// Returns a Tower layer guarded by the named breaker.
    pub fn layer(&self, name: &str) -> CircuitBreakerLayer {
        CircuitBreakerLayer::new(self.get_breaker(name))
    }

    /// Returns the status of `name`, or `None` if it was never registered.
    ///
    /// Never creates a breaker.
    pub fn status(&self, name: &str) -> Option<CircuitBreakerStatus> {
        self.breakers.read().get(name).map(CircuitBreaker::status)
    }

    /// Returns the status of every registered breaker, keyed by name.
    pub fn all_statuses(&self) -> BTreeMap<String, CircuitBreakerStatus> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.status()))
            .collect()
    }

    /// Forces the named breaker closed. Returns whether it existed.
    pub fn reset(&self, name: &str) -> bool {
        // Listeners may call back into the registry.
        let breaker = self.breakers.read().get(name).cloned();
        match breaker {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Forces every registered breaker closed.
    pub fn reset_all(&self) {
        let breakers: Vec<CircuitBreaker> = self.breakers.read().values().cloned().collect();
        for breaker in breakers {
            breaker.reset();
        }
    }

    /// Names of every registered breaker, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered breakers.
    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    /// Returns true if no breaker has been registered.
    pub fn is_empty(&self) -> bool {
        self.breakers.read().is_empty()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("breakers", &self.names())
            .finish()
    }
}
