use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::summary::{BatchResult, BatchStatus};
use crate::task::{Outcome, Stats, Task, TaskError, TaskId, TaskResult, TaskState};
use crate::thread_pool::{NaiveThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};
use crate::{PoolError, Result};

/// How tasks are launched onto worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaunchPolicy {
    /// At most `max_concurrency` tasks run at once; a fixed set of workers
    /// take tasks from a FIFO queue in submission order.
    #[default]
    Bounded,
    /// Every task gets its own thread immediately. The concurrency bound
    /// is only advisory.
    Unbounded,
    /// Like `Bounded`, but on a work-stealing `rayon` pool.
    WorkStealing,
}

impl fmt::Display for LaunchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchPolicy::Bounded => write!(f, "bounded"),
            LaunchPolicy::Unbounded => write!(f, "unbounded"),
            LaunchPolicy::WorkStealing => write!(f, "work-stealing"),
        }
    }
}

impl FromStr for LaunchPolicy {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bounded" => Ok(LaunchPolicy::Bounded),
            "unbounded" => Ok(LaunchPolicy::Unbounded),
            "work-stealing" | "rayon" => Ok(LaunchPolicy::WorkStealing),
            _ => Err(PoolError::InvalidConfiguration(format!(
                "Invalid launch policy: {s}. Must be 'bounded', 'unbounded' or 'work-stealing'."
            ))),
        }
    }
}

/// A flag that stops tasks of a batch from starting.
///
/// Tasks already running finish normally; tasks that have not started
/// yet report [`TaskError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// Creates a flag that is not tripped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Configuration of a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    max_concurrency: usize,
    policy: LaunchPolicy,
    timeout: Option<Duration>,
    cancellation: Option<Cancellation>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig::new(num_cpus::get())
    }
}

impl PoolConfig {
    /// Bounded launch with the given concurrency bound and no timeout.
    pub fn new(max_concurrency: usize) -> Self {
        PoolConfig {
            max_concurrency,
            policy: LaunchPolicy::default(),
            timeout: None,
            cancellation: None,
        }
    }

    /// Sets the launch policy.
    pub fn policy(mut self, policy: LaunchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets how long the coordinator waits for the whole batch.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation flag.
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// The configured concurrency bound.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The configured launch policy.
    pub fn launch_policy(&self) -> LaunchPolicy {
        self.policy
    }

    /// Checks the configuration before anything is dispatched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a zero concurrency bound or a
    /// zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(PoolError::InvalidConfiguration(
                "max_concurrency must be at least 1".to_owned(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(PoolError::InvalidConfiguration(
                "timeout must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Messages workers send to the coordinator.
enum Event {
    Started(TaskId),
    Finished(TaskResult),
}

/// Counts workers currently inside a task body and remembers the peak.
#[derive(Default)]
struct ActivityProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityProbe {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Per-batch state shared by every worker.
struct Shared<F> {
    process: F,
    probe: ActivityProbe,
    cancellation: Option<Cancellation>,
    abandoned: AtomicBool,
}

impl<F> Shared<F> {
    fn should_skip(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
            || self.cancellation.as_ref().is_some_and(Cancellation::is_cancelled)
    }
}

/// Runs one batch of string tasks with bounded parallelism and aggregates
/// the results.
///
/// A pool lives for exactly one batch: [`WorkerPool::run`] consumes it,
/// and every executor, channel and counter it creates is dropped when the
/// batch is done.
pub struct WorkerPool<F> {
    config: PoolConfig,
    process: F,
}

impl<F, E> WorkerPool<F>
where
    F: Fn(&str) -> std::result::Result<Stats, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    /// Creates a pool that runs `process` on every payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `config` is invalid.
    pub fn new(config: PoolConfig, process: F) -> Result<Self> {
        config.validate()?;
        Ok(WorkerPool { config, process })
    }

    /// Processes `payloads`, one task each, numbered in input order.
    ///
    /// Blocks until every task has reported back or the configured timeout
    /// expires. The returned results are sorted by task id.
    pub fn run<I, S>(self, payloads: I) -> Result<BatchResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks = Task::batch(payloads);
        if tasks.is_empty() {
            debug!("Empty batch, nothing to dispatch");
            return Ok(BatchResult::empty());
        }

        let workers = self.config.max_concurrency.min(tasks.len());
        debug!(
            "Dispatching {} tasks with {} policy and {} workers",
            tasks.len(),
            self.config.policy,
            workers
        );
        match self.config.policy {
            LaunchPolicy::Bounded => self.dispatch(SharedQueueThreadPool::new(workers)?, tasks),
            LaunchPolicy::Unbounded => self.dispatch(NaiveThreadPool::new(workers)?, tasks),
            LaunchPolicy::WorkStealing => self.dispatch(RayonThreadPool::new(workers)?, tasks),
        }
    }

    fn dispatch<P: ThreadPool>(self, executor: P, tasks: Vec<Task>) -> Result<BatchResult> {
        let n = tasks.len();
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let shared = Arc::new(Shared {
            process: self.process,
            probe: ActivityProbe::default(),
            cancellation: self.config.cancellation,
            abandoned: AtomicBool::new(false),
        });
        let (tx, rx) = channel::unbounded::<Event>();

        // Jobs take ownership of their task, so keep the payloads around
        // for results the coordinator has to fill in itself.
        let payloads: Vec<Arc<str>> = tasks.iter().map(Task::shared_payload).collect();
        let mut states = vec![TaskState::Queued; n];
        let mut results = Vec::with_capacity(n);

        for task in tasks {
            let id = task.id();
            let job = {
                let shared = Arc::clone(&shared);
                let tx = tx.clone();
                move || execute::<F, E>(&shared, task, &tx)
            };
            match executor.spawn(job) {
                Ok(()) => states[id] = TaskState::Dispatched,
                Err(e) => {
                    warn!("Task {id} could not be dispatched: {e}");
                    states[id] = TaskState::Failed;
                    results.push(TaskResult {
                        task_id: id,
                        payload: payloads[id].to_string(),
                        outcome: Outcome::Failure(TaskError::Dispatch(e.to_string())),
                    });
                }
            }
        }
        // Only the workers hold senders now, so the channel disconnects
        // once every job has run or been dropped.
        drop(tx);

        let mut status = BatchStatus::Complete;
        while results.len() < n {
            let event = match deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match event {
                Ok(Event::Started(id)) => {
                    if !states[id].is_terminal() {
                        states[id] = TaskState::Running;
                    }
                }
                Ok(Event::Finished(result)) => {
                    let id = result.task_id;
                    states[id] = if result.is_success() {
                        TaskState::Completed
                    } else {
                        TaskState::Failed
                    };
                    debug!("Task {id} finished ({:?})", states[id]);
                    results.push(result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    shared.abandoned.store(true, Ordering::SeqCst);
                    let missing = unfinished(&states);
                    warn!(
                        "Timed out waiting for {} of {} tasks: {:?}",
                        missing.len(),
                        n,
                        missing
                    );
                    status = BatchStatus::PartialTimeout { missing };
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for id in unfinished(&states) {
                        error!("Task {id} was dropped without reporting a result");
                        states[id] = TaskState::Failed;
                        results.push(TaskResult {
                            task_id: id,
                            payload: payloads[id].to_string(),
                            outcome: Outcome::Failure(TaskError::Dispatch(
                                "worker exited without reporting a result".to_owned(),
                            )),
                        });
                    }
                }
            }
        }

        Ok(BatchResult::new(n, results, status, shared.probe.peak()))
    }
}

/// Submits `payloads` to a bounded-launch pool with no timeout.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if `max_concurrency` is zero.
pub fn submit<I, S, F, E>(payloads: I, max_concurrency: usize, process: F) -> Result<BatchResult>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: Fn(&str) -> std::result::Result<Stats, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    WorkerPool::new(PoolConfig::new(max_concurrency), process)?.run(payloads)
}

/// Task body run on a worker thread. Always publishes exactly one
/// `Finished` event.
fn execute<F, E>(shared: &Shared<F>, task: Task, tx: &Sender<Event>)
where
    F: Fn(&str) -> std::result::Result<Stats, E>,
    E: fmt::Display,
{
    let id = task.id();
    let outcome = if shared.should_skip() {
        debug!("Task {id} cancelled before start");
        Outcome::Failure(TaskError::Cancelled)
    } else {
        // Send errors mean the coordinator stopped waiting.
        let _ = tx.send(Event::Started(id));
        debug!("Task {id} processing '{}'", task.payload());
        shared.probe.enter();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (shared.process)(task.payload())))
        {
            Ok(Ok(stats)) => Outcome::Success(stats),
            Ok(Err(e)) => {
                warn!("Task {id} failed: {e}");
                Outcome::Failure(TaskError::Failed(e.to_string()))
            }
            Err(panic) => {
                let msg = panic_message(&*panic);
                error!("Task {id} panicked: {msg}");
                Outcome::Failure(TaskError::Panicked(msg))
            }
        };
        shared.probe.exit();
        if let Outcome::Success(_) = outcome {
            debug!("Task {id} completed processing '{}'", task.payload());
        }
        outcome
    };

    let result = TaskResult {
        task_id: id,
        payload: task.payload().to_owned(),
        outcome,
    };
    if tx.send(Event::Finished(result)).is_err() {
        debug!("Task {id} finished after the coordinator stopped waiting");
    }
}

fn unfinished(states: &[TaskState]) -> Vec<TaskId> {
    states
        .iter()
        .enumerate()
        .filter(|(_, state)| !state.is_terminal())
        .map(|(id, _)| id)
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
