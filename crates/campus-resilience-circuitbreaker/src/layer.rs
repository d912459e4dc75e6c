use crate::{CircuitBreaker, CircuitBreakerError};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A Tower layer that guards an inner service with a shared [`CircuitBreaker`].
///
/// Every service produced by the layer reports into the same breaker, so a
/// dependency tripped through one handler is seen as open by all of them.
///
/// ```rust
/// use campus_resilience_circuitbreaker::CircuitBreakerRegistry;
/// use tower::{ServiceBuilder, service_fn};
///
/// let breakers = CircuitBreakerRegistry::new();
/// let service = ServiceBuilder::new()
///     .layer(breakers.layer("media-cdn"))
///     .service(service_fn(|path: String| async move {
///         Ok::<_, std::io::Error>(path.len())
///     }));
/// # drop(service);
/// ```
#[derive(Clone, Debug)]
pub struct CircuitBreakerLayer {
    breaker: CircuitBreaker,
}

impl CircuitBreakerLayer {
    /// Creates a layer that reports into `breaker`.
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self { breaker }
    }

    /// The breaker shared by every service this layer produces.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = BreakerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        BreakerService {
            inner: service,
            breaker: self.breaker.clone(),
        }
    }
}

/// Service produced by [`CircuitBreakerLayer`].
#[derive(Clone, Debug)]
pub struct BreakerService<S> {
    inner: S,
    breaker: CircuitBreaker,
}

impl<S> BreakerService<S> {
    /// The breaker guarding this service.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S, Req> Service<Req> for BreakerService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let breaker = self.breaker.clone();
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { breaker.call(move || inner.call(req)).await })
    }
}
