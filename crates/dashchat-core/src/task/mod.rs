//! Background side effects with explicit handles.
//!
//! Work that must not delay or fail a chat response (for example bumping a
//! project's activity timestamp) runs here instead of as a detached future.
//! Each spawn returns a [`TaskHandle`]; failures are sent to an error
//! channel instead of being dropped. `shutdown` stops accepting work and
//! waits for everything already spawned.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// A background task that returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.task, self.error)
    }
}

/// How a spawned task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    /// Cancelled by shutdown before it finished.
    Cancelled,
    /// Never started because the owner was already shut down.
    Rejected,
}

/// Handle to one spawned side effect.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    join: Option<JoinHandle<TaskOutcome>>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for the task and report how it ended.
    pub async fn join(self) -> TaskOutcome {
        match self.join {
            Some(join) => join.await.unwrap_or_else(|e| TaskOutcome::Failed(e.to_string())),
            None => TaskOutcome::Rejected,
        }
    }
}

/// Owner of all background side effects in a process.
#[derive(Clone)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    cancel: CancellationToken,
    failures: mpsc::UnboundedSender<TaskFailure>,
}

impl BackgroundTasks {
    /// Create the owner and the receiving end of its error channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskFailure>) {
        let (failures, rx) = mpsc::unbounded_channel();
        let tasks = Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            failures,
        };
        (tasks, rx)
    }

    /// Spawn a side effect. Errors go to the failure channel.
    pub fn spawn<F, E>(&self, name: &'static str, work: F) -> TaskHandle
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        if self.tracker.is_closed() {
            warn!(task = name, "Background task rejected after shutdown");
            return TaskHandle { name, join: None };
        }

        let cancel = self.cancel.clone();
        let failures = self.failures.clone();
        let join = self.tracker.spawn(async move {
            let result = tokio::select! {
                result = work => result,
                _ = cancel.cancelled() => {
                    debug!(task = name, "Background task cancelled");
                    return TaskOutcome::Cancelled;
                }
            };
            match result {
                Ok(()) => {
                    debug!(task = name, "Background task finished");
                    TaskOutcome::Succeeded
                }
                Err(e) => {
                    let error = e.to_string();
                    // The receiver may already be gone during shutdown.
                    let _ = failures.send(TaskFailure {
                        task: name,
                        error: error.clone(),
                    });
                    TaskOutcome::Failed(error)
                }
            }
        });

        TaskHandle {
            name,
            join: Some(join),
        }
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait for spawned tasks to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancel whatever is still running, then wait for it.
    pub async fn abort(&self) {
        self.cancel.cancel();
        self.shutdown().await;
    }

    /// Drain for at most `grace`, then cancel what is left.
    ///
    /// Returns `false` when tasks had to be cancelled.
    pub async fn shutdown_within(&self, grace: Duration) -> bool {
        if tokio::time::timeout(grace, self.shutdown()).await.is_ok() {
            return true;
        }
        warn!(
            in_flight = self.in_flight(),
            "Background tasks did not drain in time, cancelling"
        );
        self.abort().await;
        false
    }
}

/// Log every failure reported by background tasks until the channel closes.
pub fn spawn_failure_reporter(
    mut failures: mpsc::UnboundedReceiver<TaskFailure>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut reported = 0;
        while let Some(failure) = failures.recv().await {
            warn!(task = failure.task, error = %failure.error, "Background task failed");
            reported += 1;
        }
        reported
    })
}
