use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::{CdkError, CdkResult, ErrorKind};
use crate::{bail, cdk_error};

/// How long [`WorkerPool::ensure_drained`] waits for each remaining task to
/// finish its final bookkeeping before declaring it stuck.
const DRAIN_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(5);

/// Internal state for [`WorkerPool`].
#[derive(Debug)]
struct WorkerPoolInner {
    /// Owns all spawned pool tasks.
    join_set: JoinSet<()>,
    /// Panics collected while reaping finished tasks.
    errors: Vec<CdkError>,
    /// Whether the pool stopped accepting work.
    shutting_down: bool,
}

impl WorkerPoolInner {
    fn new() -> Self {
        Self {
            join_set: JoinSet::new(),
            errors: Vec::new(),
            shutting_down: false,
        }
    }

    /// Collects results of tasks that already finished.
    ///
    /// Successful completions are discarded, cancellations are expected during
    /// shutdown, and panics are recorded for the final pool check.
    fn reap_finished(&mut self) {
        while let Some(result) = self.join_set.try_join_next() {
            match result {
                Ok(()) => {}
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("pool task was cancelled");
                    } else {
                        error!(error = %join_err, "pool task panicked");
                        self.errors.push(cdk_error!(
                            ErrorKind::WorkerPanic,
                            "Worker pool task panicked",
                            join_err
                        ));
                    }
                }
            }
        }
    }
}

/// Fixed-capacity pool executing partition generator and reader tasks.
///
/// Two ceilings bound the pool. The outstanding-task ceiling is admission
/// control: [`WorkerPool::submit`] blocks its caller while the number of
/// submitted-but-not-completed tasks is at the ceiling, so a fast producer
/// cannot flood memory with pending work. The worker ceiling caps how many
/// tasks execute simultaneously; tasks admitted beyond it wait their turn
/// inside the pool.
///
/// Submission is expected from the single orchestrator task only, but the pool
/// itself is safe to clone and share.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    inner: Arc<Mutex<WorkerPoolInner>>,
    outstanding: Arc<Semaphore>,
    running: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a new pool with the given execution and admission ceilings.
    ///
    /// Both ceilings must be non-zero; configuration validation enforces this
    /// upstream.
    pub fn new(max_workers: usize, max_outstanding_tasks: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WorkerPoolInner::new())),
            outstanding: Arc::new(Semaphore::new(max_outstanding_tasks)),
            running: Arc::new(Semaphore::new(max_workers)),
        }
    }

    /// Schedules a task on the pool.
    ///
    /// Blocks until the number of outstanding tasks drops below the ceiling;
    /// work is never dropped or rejected for capacity reasons. Fails only when
    /// the pool has been shut down.
    pub async fn submit<F>(&self, future: F) -> CdkResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(permit) = self.outstanding.clone().acquire_owned().await else {
            bail!(
                ErrorKind::InvalidState,
                "Worker pool is shut down",
                "task submitted after the pool stopped accepting work"
            );
        };

        let running = self.running.clone();
        let mut inner = self.inner.lock().await;
        if inner.shutting_down {
            bail!(
                ErrorKind::InvalidState,
                "Worker pool is shut down",
                "task submitted after the pool stopped accepting work"
            );
        }

        inner.reap_finished();

        inner.join_set.spawn(async move {
            // The admission permit is held for the task's whole lifetime: the
            // outstanding count only drops when the task completes.
            let _outstanding = permit;
            let Ok(_running) = running.acquire_owned().await else {
                return;
            };
            future.await;
        });

        Ok(())
    }

    /// Stops accepting new work and cancels queued and in-flight tasks.
    ///
    /// Tasks not yet running never start; running tasks are cancelled at their
    /// next await point. The call does not wait for them, so termination stays
    /// prompt on a fatal error.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.shutting_down {
            return;
        }
        inner.shutting_down = true;
        inner.join_set.abort_all();
        self.outstanding.close();
        self.running.close();

        info!("worker pool shut down");
    }

    /// Verifies that every submitted task finished cleanly.
    ///
    /// Called once the completion protocol believes all work is done. A task
    /// whose final queue send has been consumed may still be an instant away
    /// from returning, so each remaining task gets a bounded grace period to
    /// finish. A task that panicked or outlives the grace period indicates a
    /// bug in the pipeline itself and is fatal.
    pub async fn ensure_drained(&self) -> CdkResult<()> {
        let mut inner = self.inner.lock().await;

        while !inner.join_set.is_empty() {
            match tokio::time::timeout(DRAIN_GRACE_PERIOD, inner.join_set.join_next()).await {
                Err(_) => {
                    bail!(
                        ErrorKind::InvalidState,
                        "Worker pool has unfinished tasks",
                        format!(
                            "{} tasks still outstanding after the sync claimed completion",
                            inner.join_set.len()
                        )
                    );
                }
                Ok(None) => break,
                Ok(Some(Ok(()))) => {}
                Ok(Some(Err(join_err))) => {
                    if join_err.is_cancelled() {
                        debug!("pool task was cancelled");
                    } else {
                        error!(error = %join_err, "pool task panicked");
                        inner.errors.push(cdk_error!(
                            ErrorKind::WorkerPanic,
                            "Worker pool task panicked",
                            join_err
                        ));
                    }
                }
            }
        }

        if !inner.errors.is_empty() {
            return Err(std::mem::take(&mut inner.errors).into());
        }

        Ok(())
    }
}
