//! Supervised task accounting.
//!
//! # Responsibilities
//! - Count outstanding long-lived tasks (listener run, shutdown coordinator)
//! - Mark each task done exactly once, even when it panics or is aborted
//! - Let the main loop wait until nothing is outstanding
//!
//! # Design Decisions
//! - `add` returns a guard; `done` is the guard's drop, so it cannot be
//!   skipped or repeated
//! - Panics inside supervised tasks are caught and logged, never propagated

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::http::fault::Fault;
use crate::observability::panics;

/// Counted set of outstanding supervised tasks.
#[derive(Debug, Clone)]
pub struct SupervisedTaskSet {
    outstanding: Arc<watch::Sender<usize>>,
}

impl SupervisedTaskSet {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            outstanding: Arc::new(tx),
        }
    }

    /// Register one outstanding task. Dropping the guard marks it done.
    pub fn add(&self) -> TaskGuard {
        self.outstanding.send_modify(|n| *n += 1);
        TaskGuard {
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Spawn `task` as a supervised task.
    ///
    /// A panic inside the task is logged at error level and swallowed; the
    /// task is marked done either way.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.add();
        tokio::spawn(async move {
            let _guard = guard;
            tracing::debug!(task = name, "Supervised task started");
            let outcome = AssertUnwindSafe(panics::contained(task)).catch_unwind().await;
            if let Err(panic) = outcome {
                let record = Fault::from_panic(panic).record();
                tracing::error!(task = name, fault = %record.detail, "Supervised task panicked");
            } else {
                tracing::debug!(task = name, "Supervised task finished");
            }
        })
    }

    /// Number of tasks not yet marked done.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait until every added task has been marked done.
    pub async fn wait(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for SupervisedTaskSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks its task done when dropped.
#[derive(Debug)]
pub struct TaskGuard {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.outstanding.send_modify(|n| *n -= 1);
    }
}
