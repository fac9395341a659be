#![deny(missing_docs)]

//! A bounded worker pool for batches of string tasks.
//!
//! Each payload becomes a task that runs on a worker thread and publishes
//! exactly one result to a shared completion channel. The coordinator
//! drains the channel, sorts the results by task id and aggregates them,
//! so the output is deterministic whatever order the workers finish in.

mod error;
mod pool;
pub mod process;
pub mod report;
mod summary;
mod task;
/// Executors that run worker jobs.
pub mod thread_pool;

pub use error::{PoolError, Result};
pub use pool::{submit, Cancellation, LaunchPolicy, PoolConfig, WorkerPool};
pub use summary::{BatchResult, BatchStatus, Summary};
pub use task::{Outcome, Stats, Task, TaskError, TaskId, TaskResult, TaskState};
pub use thread_pool::{NaiveThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};
