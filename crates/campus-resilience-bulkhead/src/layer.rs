use crate::error::{BulkheadError, TaskError};
use crate::TaskQueue;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Admission-control layer backed by a [`TaskQueue`].
///
/// Every request becomes a queued task that completes when the inner
/// service's response future does. A request the queue refuses fails
/// immediately with the [`BulkheadError`] converted into the inner service's
/// error type and never reaches the inner service.
///
/// ```rust
/// use campus_resilience_bulkhead::{BulkheadManager, BulkheadSettings};
/// use tower::{BoxError, ServiceBuilder, service_fn};
///
/// let bulkheads = BulkheadManager::new(BulkheadSettings::default());
/// let login = ServiceBuilder::new()
///     .layer(bulkheads.admit("auth"))
///     .service(service_fn(|user: String| async move {
///         Ok::<_, BoxError>(format!("session for {user}"))
///     }));
/// # drop(login);
/// ```
///
/// Turning a refusal into the structured "unavailable" body:
///
/// ```rust
/// use campus_resilience_bulkhead::BulkheadError;
/// use tower::BoxError;
///
/// fn respond(err: BoxError) -> (u16, String) {
///     match err.downcast_ref::<BulkheadError>().and_then(BulkheadError::rejection) {
///         Some(rejection) => (rejection.status(), rejection.message),
///         None => (500, err.to_string()),
///     }
/// }
/// # let _ = respond;
/// ```
#[derive(Clone, Debug)]
pub struct AdmissionLayer {
    queue: TaskQueue,
    service: String,
}

impl AdmissionLayer {
    /// Admits work onto `queue`, reporting refusals under the queue's name.
    pub fn new(queue: TaskQueue) -> Self {
        let service = queue.name().to_string();
        Self { queue, service }
    }

    pub(crate) fn for_service(service: &str, queue: TaskQueue) -> Self {
        Self {
            queue,
            service: service.to_string(),
        }
    }

    /// The queue admitted work runs on.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = Admission<S>;

    fn layer(&self, service: S) -> Self::Service {
        Admission {
            inner: service,
            queue: self.queue.clone(),
            service: self.service.clone(),
        }
    }
}

/// Service produced by [`AdmissionLayer`].
#[derive(Clone, Debug)]
pub struct Admission<S> {
    inner: S,
    queue: TaskQueue,
    service: String,
}

impl<S, Req> Service<Req> for Admission<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<BulkheadError> + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let service = self.service.clone();

        // Admission is decided here, before the response future is polled.
        let admitted = self.queue.enqueue(move || inner.call(req));

        Box::pin(async move {
            let refuse = |err: BulkheadError| -> S::Error { err.relabel(&service).into() };
            let handle = admitted.map_err(refuse)?;
            match handle.await {
                Ok(response) => Ok(response),
                Err(TaskError::Failed(err)) => Err(err),
                Err(TaskError::Bulkhead(err)) => Err(refuse(err)),
            }
        })
    }
}
