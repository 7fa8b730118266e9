//! Bounded pool for blocking synthesis calls.

use crate::error::{CadenceError, CadenceResult};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Named rayon pool; async callers wait on a oneshot for each job
#[derive(Debug, Clone)]
pub struct WorkerPool {
    pool: Arc<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Create a pool with `threads` workers; zero means one per logical CPU
    ///
    /// # Errors
    ///
    /// Returns a concurrency error if the threads cannot be spawned.
    pub fn new(threads: usize) -> CadenceResult<Self> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cadence-synth-{i}"))
            .build()
            .map_err(|e| CadenceError::concurrency(format!("Failed to build worker pool: {e}")))?;

        info!("Started synthesis worker pool with {} threads", threads);
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run a blocking job and await its result
    ///
    /// A panicking job is reported as a concurrency error instead of
    /// taking a worker thread down.
    pub fn run<T, F>(&self, job: F) -> impl Future<Output = CadenceResult<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(job));
            // the receiver is gone when the request was cancelled
            let _ = tx.send(outcome);
        });

        async move {
            match rx.await? {
                Ok(value) => Ok(value),
                Err(_) => {
                    error!("Synthesis worker job panicked");
                    Err(CadenceError::concurrency("Worker job panicked"))
                }
            }
        }
    }
}
