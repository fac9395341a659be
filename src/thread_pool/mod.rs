use crate::Result;

/// An executor that runs boxed jobs on worker threads.
///
/// The coordinator hands every task to one of these; the implementation
/// decides how many jobs may run at once.
pub trait ThreadPool {
    /// Creates a new thread pool with the given number of threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created (e.g., zero threads).
    fn new(threads: usize) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool.
    ///
    /// The function will be executed by one of the threads in the pool.
    /// Jobs may finish in any order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool can no longer accept jobs.
    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;
}

mod naive;
mod rayon_pool;
mod shared_queue;

pub use self::naive::NaiveThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;

use crate::PoolError;

fn check_threads(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(PoolError::InvalidConfiguration(
            "thread pool needs at least one thread".to_owned(),
        ));
    }
    Ok(())
}
