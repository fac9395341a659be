use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error};

use super::{check_threads, ThreadPool};
use crate::{PoolError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool using a shared job queue.
///
/// A fixed set of workers pull jobs from a single FIFO channel, so at most
/// `threads` jobs run at once and jobs start in the order they were
/// spawned. If a job panics, the worker keeps going.
///
/// Dropping the pool closes the queue; workers finish the jobs already
/// queued and then exit.
pub struct SharedQueueThreadPool {
    tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: usize) -> Result<Self> {
        check_threads(threads)?;
        let (tx, rx) = channel::unbounded::<Job>();

        for id in 0..threads {
            spawn_worker(id, rx.clone())?;
        }

        Ok(SharedQueueThreadPool { tx })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Box::new(job))
            .map_err(|_| PoolError::ThreadPool("thread pool has no active threads".to_owned()))
    }
}

/// Spawns a single worker thread that pulls jobs from the receiver until
/// the channel is closed.
fn spawn_worker(id: usize, rx: Receiver<Job>) -> Result<()> {
    thread::Builder::new()
        .name(format!("pool-worker-{id}"))
        .spawn(move || loop {
            match rx.recv() {
                Ok(job) => {
                    debug!("Worker {id} executing job");
                    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).is_err() {
                        error!("Worker {id} job panicked, continuing");
                    }
                }
                Err(_) => {
                    debug!("Worker {id}: channel closed, shutting down");
                    return;
                }
            }
        })?;
    Ok(())
}
