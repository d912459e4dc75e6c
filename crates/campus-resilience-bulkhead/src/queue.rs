use crate::config::{TaskQueueConfig, TaskQueueConfigBuilder};
use crate::error::{BulkheadError, TaskError};
use crate::events::{BulkheadEvent, RejectionReason};
use crate::manager::QueueHealth;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;

enum Dispatch {
    Run(Arc<Shared>),
    Abandon(BulkheadError),
}

/// A type-erased task. Running it yields the future that drives the task and
/// reports its outcome to the matching [`TaskHandle`]; abandoning it reports
/// the given error instead.
type Job = Box<dyn FnOnce(Dispatch) -> BoxFuture<'static, ()> + Send>;

struct Pending {
    job: Job,
    enqueued_at: Instant,
}

struct QueueState {
    pending: VecDeque<Pending>,
    running: usize,
    closed: bool,
}

impl QueueState {
    /// A task submitted now would skip the wait line.
    fn starts_now(&self, concurrency: usize) -> bool {
        self.pending.is_empty() && self.running < concurrency
    }
}

struct Shared {
    config: TaskQueueConfig,
    state: Mutex<QueueState>,
}

/// A bounded, bulkhead-isolated task scheduler for one service.
///
/// At most `concurrency` tasks run at once and at most `max_queue_size` wait
/// for a slot. Each running task is raced against the queue timeout. Tasks
/// start in FIFO order.
///
/// Clones share the same queue. Tasks are spawned on the ambient Tokio
/// runtime, so `enqueue` must be called from within one.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

impl TaskQueue {
    /// Creates an open, empty queue.
    pub fn new(config: TaskQueueConfig) -> Self {
        #[cfg(feature = "metrics")]
        crate::describe_metrics();

        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    running: 0,
                    closed: false,
                }),
            }),
        }
    }

    /// Returns a builder with the default limits.
    pub fn builder() -> TaskQueueConfigBuilder {
        TaskQueueConfigBuilder::new()
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Returns the queue's configuration.
    pub fn config(&self) -> &TaskQueueConfig {
        &self.shared.config
    }

    /// Submits `task` for execution and returns a handle to its outcome.
    ///
    /// `task` is not invoked until a slot frees up. Fails immediately with
    /// [`BulkheadError::QueueClosed`] after [`shutdown`](Self::shutdown), or
    /// [`BulkheadError::QueueOverflow`] when the task would have to wait and
    /// `max_queue_size` tasks are already waiting; in both cases the queue is
    /// left unchanged. A task that can start right away is always admitted.
    ///
    /// Dropping the returned handle does not cancel the task.
    pub fn enqueue<F, Fut, T, E>(&self, task: F) -> Result<TaskHandle<T, E>, BulkheadError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |dispatch| match dispatch {
            Dispatch::Run(shared) => Box::pin(async move {
                let outcome = shared.run(task).await;
                // The caller may have dropped its handle.
                let _ = tx.send(outcome);
            }),
            Dispatch::Abandon(err) => {
                let _ = tx.send(Err(TaskError::Bulkhead(err)));
                Box::pin(std::future::ready(()))
            }
        });

        let config = &self.shared.config;
        let admitted = {
            let mut state = self.shared.state.lock();
            if state.closed {
                Err(RejectionReason::Closed)
            } else if state.pending.len() >= config.max_queue_size
                && !state.starts_now(config.concurrency)
            {
                Err(RejectionReason::QueueFull)
            } else {
                state.pending.push_back(Pending {
                    job,
                    enqueued_at: Instant::now(),
                });
                Ok(state.pending.len())
            }
        };

        let queue_depth = match admitted {
            Ok(depth) => depth,
            Err(reason) => return Err(self.shared.reject(reason)),
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(queue = %config.name, queue_depth, "task queued");

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_tasks_total", "queue" => config.name.clone(), "outcome" => "queued")
                .increment(1);
            gauge!("bulkhead_queue_depth", "queue" => config.name.clone()).set(queue_depth as f64);
        }

        config.event_listeners.emit(&BulkheadEvent::TaskQueued {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            queue_depth,
        });

        self.shared.drain();

        Ok(TaskHandle {
            rx,
            service: config.name.clone(),
        })
    }

    /// Closes the queue and drops every pending task.
    ///
    /// Handles of dropped tasks resolve to [`BulkheadError::QueueClosed`].
    /// Tasks already running are left to finish. Later calls are no-ops.
    pub fn shutdown(&self) {
        let dropped: Vec<Pending> = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.pending.drain(..).collect()
        };

        let config = &self.shared.config;
        let count = dropped.len();
        for pending in dropped {
            let _ = (pending.job)(Dispatch::Abandon(BulkheadError::QueueClosed {
                service: config.name.clone(),
            }));
        }

        #[cfg(feature = "tracing")]
        tracing::info!(queue = %config.name, dropped = count, "queue shut down");

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_queue_depth", "queue" => config.name.clone()).set(0.0);

        config.event_listeners.emit(&BulkheadEvent::QueueShutdown {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            dropped: count,
        });
    }

    /// Number of tasks waiting for a slot.
    pub fn size(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Number of tasks currently running.
    pub fn running(&self) -> usize {
        self.shared.state.lock().running
    }

    /// Maximum number of tasks running at once.
    pub fn concurrency(&self) -> usize {
        self.shared.config.concurrency
    }

    /// Returns true when the pending queue is full.
    pub fn is_overloaded(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending.len() >= self.shared.config.max_queue_size
            && !state.starts_now(self.shared.config.concurrency)
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Running and queued counts, read under one lock.
    pub fn health(&self) -> QueueHealth {
        let state = self.shared.state.lock();
        QueueHealth {
            running: state.running,
            queued: state.pending.len(),
            concurrency: self.shared.config.concurrency,
        }
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TaskQueue")
            .field("name", &self.shared.config.name)
            .field("running", &state.running)
            .field("queued", &state.pending.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl Shared {
    /// Starts pending tasks until every slot is taken.
    ///
    /// Each started task runs on its own spawned task and calls back into
    /// `drain` when it settles, so sustained load never grows the stack.
    fn drain(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(queue = %self.config.name, "no tokio runtime, tasks stay queued");
            return;
        };

        loop {
            let (pending, running) = {
                let mut state = self.state.lock();
                if state.running >= self.config.concurrency {
                    return;
                }
                let Some(pending) = state.pending.pop_front() else {
                    return;
                };
                state.running += 1;
                (pending, state.running)
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(queue = %self.config.name, running, "task started");

            #[cfg(feature = "metrics")]
            {
                counter!("bulkhead_tasks_total", "queue" => self.config.name.clone(), "outcome" => "started")
                    .increment(1);
                gauge!("bulkhead_running_tasks", "queue" => self.config.name.clone())
                    .set(running as f64);
                gauge!("bulkhead_queue_depth", "queue" => self.config.name.clone())
                    .set(self.state.lock().pending.len() as f64);
            }

            self.config.event_listeners.emit(&BulkheadEvent::TaskStarted {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                running,
                waited: pending.enqueued_at.elapsed(),
            });

            let slot = RunningSlot {
                shared: Arc::clone(self),
            };
            let task = (pending.job)(Dispatch::Run(Arc::clone(self)));
            runtime.spawn(async move {
                let _slot = slot;
                task.await;
            });
        }
    }

    /// Runs one task against the queue timeout.
    async fn run<F, Fut, T, E>(&self, task: F) -> Result<T, TaskError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let config = &self.config;
        let started = Instant::now();
        let mut handle = tokio::spawn(task());

        match tokio::time::timeout(config.timeout, &mut handle).await {
            Ok(Ok(Ok(value))) => {
                self.settled("finished", started);
                Ok(value)
            }
            Ok(Ok(Err(err))) => {
                self.settled("failed", started);
                Err(TaskError::Failed(err))
            }
            Ok(Err(_join_error)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(queue = %config.name, "task panicked");

                self.settled("failed", started);
                Err(TaskError::Bulkhead(BulkheadError::TaskAborted {
                    service: config.name.clone(),
                }))
            }
            Err(_elapsed) => {
                if config.cancel_on_timeout {
                    handle.abort();
                }

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    queue = %config.name,
                    timeout_ms = config.timeout.as_millis() as u64,
                    cancelled = config.cancel_on_timeout,
                    "task timed out"
                );

                #[cfg(feature = "metrics")]
                counter!("bulkhead_tasks_total", "queue" => config.name.clone(), "outcome" => "timeout")
                    .increment(1);

                config.event_listeners.emit(&BulkheadEvent::TaskTimedOut {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    timeout: config.timeout,
                });

                Err(TaskError::Bulkhead(BulkheadError::TaskTimeout {
                    service: config.name.clone(),
                    timeout: config.timeout,
                }))
            }
        }
    }

    fn settled(&self, outcome: &'static str, started: Instant) {
        let duration = started.elapsed();

        #[cfg(feature = "tracing")]
        tracing::debug!(queue = %self.config.name, outcome, ?duration, "task settled");

        #[cfg(feature = "metrics")]
        counter!("bulkhead_tasks_total", "queue" => self.config.name.clone(), "outcome" => outcome)
            .increment(1);

        let pattern_name = self.config.name.clone();
        let timestamp = Instant::now();
        let event = if outcome == "finished" {
            BulkheadEvent::TaskFinished {
                pattern_name,
                timestamp,
                duration,
            }
        } else {
            BulkheadEvent::TaskFailed {
                pattern_name,
                timestamp,
                duration,
            }
        };
        self.config.event_listeners.emit(&event);
    }

    fn reject(&self, reason: RejectionReason) -> BulkheadError {
        let config = &self.config;

        #[cfg(feature = "tracing")]
        tracing::warn!(queue = %config.name, ?reason, "task rejected");

        #[cfg(feature = "metrics")]
        counter!("bulkhead_tasks_total", "queue" => config.name.clone(), "outcome" => "rejected")
            .increment(1);

        config.event_listeners.emit(&BulkheadEvent::TaskRejected {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            reason,
        });

        match reason {
            RejectionReason::Closed => BulkheadError::QueueClosed {
                service: config.name.clone(),
            },
            RejectionReason::QueueFull => BulkheadError::QueueOverflow {
                service: config.name.clone(),
                max_queue_size: config.max_queue_size,
            },
        }
    }
}

/// Occupies one running slot. Dropping it frees the slot exactly once, even
/// if the task panicked, and starts the next pending task.
struct RunningSlot {
    shared: Arc<Shared>,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        let running = {
            let mut state = self.shared.state.lock();
            state.running = state.running.saturating_sub(1);
            state.running
        };

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_running_tasks", "queue" => self.shared.config.name.clone())
            .set(running as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = running;

        self.shared.drain();
    }
}

pin_project! {
    /// Resolves to the outcome of a task submitted with [`TaskQueue::enqueue`].
    pub struct TaskHandle<T, E> {
        #[pin]
        rx: oneshot::Receiver<Result<T, TaskError<E>>>,
        service: String,
    }
}

impl<T, E> TaskHandle<T, E> {
    /// Name of the queue the task was submitted to.
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.rx.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::Bulkhead(
                BulkheadError::TaskAborted {
                    service: this.service.clone(),
                },
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> std::fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("service", &self.service)
            .finish()
    }
}
