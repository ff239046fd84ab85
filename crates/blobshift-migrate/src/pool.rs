//! Bounded-parallelism executor for transfer tasks.
//!
//! A fixed set of worker tasks share one FIFO queue. Each worker runs one job
//! at a time, so at most `workers` jobs execute concurrently and, with a
//! single worker, jobs start in submission order.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::barrier::CompletionBarrier;
use crate::error::{MigrateError, MigrateResult};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type SharedQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Fixed-size worker pool with a completion barrier.
///
/// Must be created inside a Tokio runtime.
pub struct WorkPool {
    size: usize,
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: CompletionBarrier,
}

impl WorkPool {
    /// Spawn `workers` worker tasks. Zero workers is rejected.
    pub fn new(workers: usize) -> MigrateResult<Self> {
        if workers == 0 {
            return Err(MigrateError::InvalidPool(
                "worker count must be at least 1".into(),
            ));
        }
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx: SharedQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let handles = (0..workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&rx))))
            .collect();
        debug!(workers, "work pool started");
        Ok(Self {
            size: workers,
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            pending: CompletionBarrier::new(),
        })
    }

    /// Maximum number of concurrently running jobs.
    pub fn workers(&self) -> usize {
        self.size
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.outstanding()
    }

    /// Queue a job for execution by the next free worker.
    pub fn submit<F>(&self, job: F) -> MigrateResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.pending.enter();
        let job: Job = Box::pin(async move {
            job.await;
            drop(token);
        });
        let queue = self.queue.lock().expect("lock poisoned");
        match queue.as_ref() {
            Some(tx) => tx.send(job).map_err(|_| MigrateError::PoolClosed),
            None => Err(MigrateError::PoolClosed),
        }
    }

    /// Wait until every job submitted so far has finished.
    pub async fn wait_idle(&self) {
        self.pending.wait().await;
    }

    /// Stop accepting jobs, let queued jobs drain, and join the workers.
    pub async fn shutdown(&self) {
        self.queue.lock().expect("lock poisoned").take();
        let handles = std::mem::take(&mut *self.workers.lock().expect("lock poisoned"));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "pool worker exited abnormally");
            }
        }
        debug!(workers = self.size, "work pool stopped");
    }
}

impl std::fmt::Debug for WorkPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkPool")
            .field("workers", &self.size)
            .field("pending", &self.pending())
            .finish()
    }
}

async fn run_worker(id: usize, queue: SharedQueue) {
    loop {
        let job = queue.lock().await.recv().await;
        let Some(job) = job else { break };
        // A panicking job is contained in its own task and the worker lives on.
        if let Err(e) = tokio::spawn(job).await {
            warn!(worker = id, error = %e, "pool job panicked");
        }
    }
    debug!(worker = id, "pool worker stopped");
}
