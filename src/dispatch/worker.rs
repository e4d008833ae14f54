//! Bounded pool for file I/O
//!
//! Work runs on tokio's blocking threads, at most `worker_threads` at a
//! time. The result is posted back onto the view-host queue as a job, so
//! the `finish` half always sees the engine from the view-host thread.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::Semaphore;

use super::{Job, ViewHost};

pub(crate) struct WorkerPool {
    runtime: Handle,
    permits: Arc<Semaphore>,
    /// Weak so that pending work does not keep the view host alive
    queue: WeakUnboundedSender<Job>,
}

impl WorkerPool {
    pub(crate) fn new(runtime: Handle, worker_threads: usize, queue: WeakUnboundedSender<Job>) -> Self {
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(worker_threads.max(1))),
            queue,
        }
    }

    /// A guard that posts `job` to the view host when dropped. Moved into
    /// a `finish` closure, the job runs whether or not `finish` does.
    pub(crate) fn on_drop(&self, job: impl FnOnce(&mut ViewHost) + Send + 'static) -> HostGuard {
        HostGuard {
            queue: self.queue.clone(),
            job: Some(Box::new(job)),
        }
    }

    /// Run `work` on the pool, then `finish` on the view host.
    ///
    /// If the work panics or the view host has stopped, `finish` is
    /// dropped without running. Any completion it owns then resolves
    /// itself as an internal failure.
    pub(crate) fn offload<T, W, F>(&self, op: &'static str, work: W, finish: F)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        F: FnOnce(&mut ViewHost, T) + Send + 'static,
    {
        let permits = self.permits.clone();
        let queue = self.queue.clone();

        self.runtime.spawn(async move {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                tracing::warn!(op, "worker pool closed");
                return;
            };
            tracing::debug!(op, available = permits.available_permits(), "worker started");

            let value = match tokio::task::spawn_blocking(work).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(op, "worker task failed: {}", e);
                    return;
                }
            };
            drop(permit);

            let Some(queue) = queue.upgrade() else {
                tracing::warn!(op, "view host stopped before work finished");
                return;
            };
            let job: Job = Box::new(move |host: &mut ViewHost| finish(host, value));
            if queue.send(job).is_err() {
                tracing::warn!(op, "view host stopped before work finished");
            }
        });
    }
}

pub(crate) struct HostGuard {
    queue: WeakUnboundedSender<Job>,
    job: Option<Job>,
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        let (Some(job), Some(queue)) = (self.job.take(), self.queue.upgrade()) else {
            return;
        };
        // A stopped host has nothing left to resume
        let _ = queue.send(job);
    }
}
