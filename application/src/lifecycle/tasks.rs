//! Background task tracking
//!
//! Every long-lived unit of session work (event pump, per-kind workers) is
//! spawned through a [`TaskSet`] so the coordinator can enumerate, cancel and
//! await it at shutdown.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::{Id, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a background task ended, as reported by the task itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The task observed a cancellation request (acknowledgement).
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// Result of waiting for one task during a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Finished or acknowledged cancellation.
    Acknowledged,
    /// Ended with an error or a panic.
    Failed(String),
    /// Did not acknowledge before the deadline and was aborted.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    pub outcome: TaskOutcome,
}

struct TrackedTask {
    name: String,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), TaskFailure>>,
}

#[derive(Default)]
struct Inner {
    tasks: Vec<TrackedTask>,
    closed: bool,
}

/// Set of cancellable background tasks owned by the session.
#[derive(Default)]
pub struct TaskSet {
    inner: Mutex<Inner>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a tracked task.
    ///
    /// The body receives its cancellation token. Once the set has been
    /// drained, new tasks start with an already-cancelled token.
    pub fn spawn<F, Fut>(&self, name: impl Into<String>, body: F) -> Id
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
    {
        let name = name.into();
        let cancel = CancellationToken::new();
        let mut inner = self.lock();
        if inner.closed {
            cancel.cancel();
        }
        let handle = tokio::spawn(body(cancel.clone()));
        let id = handle.id();
        debug!(task = %name, "Spawned background task");
        inner.tasks.push(TrackedTask {
            name,
            cancel,
            handle,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().tasks.iter().map(|t| t.name.clone()).collect()
    }

    /// Cancel and await every task except the one calling this method.
    ///
    /// Waits at most `timeout` in total; tasks still running afterwards are
    /// aborted and reported as [`TaskOutcome::Abandoned`].
    pub async fn drain_except_current(&self, timeout: Duration) -> Vec<TaskReport> {
        let current = tokio::task::try_id();
        let targets: Vec<TrackedTask> = {
            let mut inner = self.lock();
            inner.closed = true;
            let (own, others): (Vec<_>, Vec<_>) = inner
                .tasks
                .drain(..)
                .partition(|t| Some(t.handle.id()) == current);
            inner.tasks = own;
            others
        };

        for task in &targets {
            task.cancel.cancel();
        }

        let deadline = Instant::now() + timeout;
        let mut reports = Vec::with_capacity(targets.len());
        for mut task in targets {
            let outcome = match tokio::time::timeout_at(deadline, &mut task.handle).await {
                Ok(Ok(Ok(()))) | Ok(Ok(Err(TaskFailure::Cancelled))) => TaskOutcome::Acknowledged,
                Ok(Ok(Err(TaskFailure::Failed(message)))) => TaskOutcome::Failed(message),
                Ok(Err(join_error)) if join_error.is_cancelled() => TaskOutcome::Acknowledged,
                Ok(Err(join_error)) => TaskOutcome::Failed(join_error.to_string()),
                Err(_elapsed) => {
                    task.handle.abort();
                    TaskOutcome::Abandoned
                }
            };
            match &outcome {
                TaskOutcome::Acknowledged => debug!(task = %task.name, "Task stopped"),
                TaskOutcome::Failed(e) => warn!(task = %task.name, error = %e, "Task failed"),
                TaskOutcome::Abandoned => {
                    warn!(task = %task.name, timeout_ms = timeout.as_millis() as u64, "Task did not stop in time, aborted")
                }
            }
            reports.push(TaskReport {
                name: task.name,
                outcome,
            });
        }
        reports
    }
}
