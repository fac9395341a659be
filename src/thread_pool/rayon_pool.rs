use super::{check_threads, ThreadPool};
use crate::{PoolError, Result};

/// A thread pool backed by the `rayon` library.
///
/// Uses rayon's work-stealing scheduler. Jobs spawned from outside the
/// pool are taken in FIFO order, and never more than `threads` of them
/// run at once.
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: usize) -> Result<Self> {
        check_threads(threads)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rayon-worker-{i}"))
            .build()
            .map_err(|e| PoolError::ThreadPool(e.to_string()))?;
        Ok(RayonThreadPool { pool })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn_fifo(job);
        Ok(())
    }
}
