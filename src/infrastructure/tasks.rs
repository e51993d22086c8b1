//! Fire-and-forget background writes and flow deadlines
//!
//! Work scheduled here runs after the caller already has its response value.
//! Nothing observes completion: a failed task is logged and dropped, never
//! retried. The tracker exists so shutdown (and tests) can wait for in-flight
//! writes to settle.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Tracked executor for best-effort store mutations
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a best-effort task; its error is logged and swallowed
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            match task.await {
                Ok(()) => debug!(task = name, "Background task completed"),
                Err(e) => warn!(task = name, error = %e, "Background task failed"),
            }
        });
    }

    /// Number of tasks still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished
    ///
    /// The tracker is reopened afterwards so new work can still be scheduled.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// Run a request flow under a deadline, mapping expiry to `Timeout`
///
/// Dropping the flow on expiry does not cancel background work it already
/// scheduled.
pub async fn with_deadline<T, F>(
    flow: &'static str,
    limit: Duration,
    future: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(flow, limit_ms = limit.as_millis() as u64, "Flow timed out");
            Err(DomainError::timeout(format!(
                "{} did not finish within {}ms",
                flow,
                limit.as_millis()
            )))
        }
    }
}
