use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::ThreadPool;
use crate::Result;

/// A naive thread pool that spawns a new thread for every job.
///
/// It doesn't reuse threads and does not limit how many jobs run at
/// once; the thread count given to [`ThreadPool::new`] is ignored.
pub struct NaiveThreadPool {
    spawned: AtomicUsize,
}

impl ThreadPool for NaiveThreadPool {
    fn new(_threads: usize) -> Result<Self> {
        Ok(NaiveThreadPool {
            spawned: AtomicUsize::new(0),
        })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        thread::Builder::new()
            .name(format!("naive-worker-{n}"))
            .spawn(job)?;
        Ok(())
    }
}
