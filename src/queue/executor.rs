//! Single-worker executor that serializes access to a non-reentrant resource
//!
//! The resource (normally the generation engine) is owned by one dedicated OS
//! thread. Callers submit closures from any context; closures run one at a
//! time in submission order and each caller awaits its own [`TaskHandle`].
//!
//! The queue is unbounded and tasks cannot be cancelled once submitted. A
//! caller that stops waiting does not remove its task; the task still runs
//! and its result is discarded.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::engine::EngineError;

type Job<R> = Box<dyn FnOnce(&mut R) + Send + 'static>;

/// Errors raised when handing work to the executor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Executor is shut down")]
    ShutDown,

    #[error("Failed to spawn executor thread: {0}")]
    Spawn(String),

    #[error("Engine initialization failed: {0}")]
    Init(EngineError),
}

/// Outcome of a task that did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("{0}")]
    Failed(EngineError),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Executor stopped before the task completed")]
    Abandoned,
}

#[derive(Default)]
struct Counters {
    queued: AtomicU64,
    running: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Executor statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub queued: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Executor with exactly one worker thread owning `R`
pub struct SerializedExecutor<R> {
    name: String,
    job_tx: Mutex<Option<mpsc::UnboundedSender<Job<R>>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl<R: Send + 'static> SerializedExecutor<R> {
    /// Create an executor around an already constructed resource
    pub fn new(name: impl Into<String>, resource: R) -> Result<Self, ExecutorError> {
        let (executor, _ready_rx) = Self::spawn(name.into(), move || Ok(resource))?;
        Ok(executor)
    }

    /// Create an executor whose resource is constructed on the worker thread.
    ///
    /// Resolves once `init` has finished; an init failure or panic is
    /// returned as [`ExecutorError::Init`].
    pub async fn start<F>(name: impl Into<String>, init: F) -> Result<Self, ExecutorError>
    where
        F: FnOnce() -> Result<R, EngineError> + Send + 'static,
    {
        let (executor, ready_rx) = Self::spawn(name.into(), init)?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(executor),
            Ok(Err(e)) => Err(ExecutorError::Init(e)),
            Err(_) => Err(ExecutorError::Init(EngineError::new(
                "executor thread exited during initialization",
            ))),
        }
    }

    fn spawn<F>(
        name: String,
        init: F,
    ) -> Result<(Self, oneshot::Receiver<Result<(), EngineError>>), ExecutorError>
    where
        F: FnOnce() -> Result<R, EngineError> + Send + 'static,
    {
        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job<R>>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let worker_name = name.clone();

        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let init_result = panic::catch_unwind(AssertUnwindSafe(init))
                    .unwrap_or_else(|payload| Err(EngineError::new(panic_message(payload.as_ref()))));

                let mut resource = match init_result {
                    Ok(resource) => {
                        let _ = ready_tx.send(Ok(()));
                        resource
                    }
                    Err(e) => {
                        error!(executor = %worker_name, error = %e, "Executor resource failed to initialize");
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                debug!(executor = %worker_name, "Executor worker started");

                while let Some(job) = job_rx.blocking_recv() {
                    job(&mut resource);
                }

                debug!(executor = %worker_name, "Executor worker stopped");
            })
            .map_err(|e| ExecutorError::Spawn(e.to_string()))?;

        let executor = Self {
            name,
            job_tx: Mutex::new(Some(job_tx)),
            worker: Mutex::new(Some(worker)),
            counters: Arc::new(Counters::default()),
        };

        Ok((executor, ready_rx))
    }

    /// Submit a task; returns without waiting for it to run.
    ///
    /// Failures and panics inside `task` are captured in the returned handle
    /// and never stop the worker.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, ExecutorError>
    where
        T: Send + 'static,
        F: FnOnce(&mut R) -> Result<T, EngineError> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let counters = self.counters.clone();
        let executor = self.name.clone();

        let job: Job<R> = Box::new(move |resource: &mut R| {
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            counters.running.store(1, Ordering::SeqCst);

            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task(resource))) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(TaskError::Failed(e)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(executor = %executor, panic = %message, "Task panicked, worker continues");
                    Err(TaskError::Panicked(message))
                }
            };

            counters.running.store(0, Ordering::SeqCst);
            if outcome.is_ok() {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            } else {
                counters.failed.fetch_add(1, Ordering::SeqCst);
            }

            if result_tx.send(outcome).is_err() {
                debug!(executor = %executor, "Requester went away, discarding task result");
            }
        });

        let guard = self.job_tx.lock();
        let job_tx = guard.as_ref().ok_or(ExecutorError::ShutDown)?;

        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if job_tx.send(job).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(ExecutorError::ShutDown);
        }

        Ok(TaskHandle { result_rx })
    }

    /// Stop accepting tasks, drain the ones already queued and join the worker
    pub async fn shutdown(&self) {
        drop(self.job_tx.lock().take());

        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return;
        };

        let name = self.name.clone();
        match tokio::task::spawn_blocking(move || worker.join()).await {
            Ok(Ok(())) => info!(executor = %name, "Executor drained and stopped"),
            Ok(Err(_)) => error!(executor = %name, "Executor worker panicked"),
            Err(e) => error!(executor = %name, error = %e, "Failed to join executor worker"),
        }
    }

    /// Whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.job_tx.lock().is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get executor statistics
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            queued: self.counters.queued.load(Ordering::SeqCst),
            running: self.counters.running.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }
}

/// Completion slot for one submitted task
#[must_use = "a task handle does nothing unless awaited"]
pub struct TaskHandle<T> {
    result_rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result_rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Abandoned)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
