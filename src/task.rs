use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of a task within one batch, assigned in submission order.
pub type TaskId = usize;

/// One immutable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    payload: Arc<str>,
}

impl Task {
    /// Creates a task with the given id and payload.
    pub fn new(id: TaskId, payload: impl Into<String>) -> Self {
        Task {
            id,
            payload: Arc::from(payload.into()),
        }
    }

    /// Builds a batch of tasks numbered `0..N` in input order.
    pub fn batch<I, S>(payloads: I) -> Vec<Task>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        payloads
            .into_iter()
            .enumerate()
            .map(|(id, payload)| Task::new(id, payload))
            .collect()
    }

    /// The task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The input payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// A shared handle to the payload, without copying the text.
    pub(crate) fn shared_payload(&self) -> Arc<str> {
        Arc::clone(&self.payload)
    }
}

/// Statistics produced by a successful task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of characters in the payload.
    pub char_count: usize,
    /// Number of whitespace-delimited words in the payload.
    pub word_count: usize,
    /// Duration of the work in seconds.
    pub processing_time: f64,
}

/// Why a single task did not produce stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskError {
    /// The processing function returned an error.
    Failed(String),
    /// The processing function panicked.
    Panicked(String),
    /// The task was never started because its batch was cancelled.
    Cancelled,
    /// The executor refused to accept the task.
    Dispatch(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Failed(msg) => write!(f, "task failed: {msg}"),
            TaskError::Panicked(msg) => write!(f, "task panicked: {msg}"),
            TaskError::Cancelled => write!(f, "task cancelled"),
            TaskError::Dispatch(msg) => write!(f, "task could not be dispatched: {msg}"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Outcome of executing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The task completed with stats.
    Success(Stats),
    /// The task failed.
    Failure(TaskError),
}

/// The immutable result of one task, published by the worker that ran it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the originating task.
    pub task_id: TaskId,
    /// The original payload, kept for reporting.
    pub payload: String,
    /// Success stats or failure.
    pub outcome: Outcome,
}

impl TaskResult {
    /// Returns the stats if the task succeeded.
    pub fn stats(&self) -> Option<&Stats> {
        match &self.outcome {
            Outcome::Success(stats) => Some(stats),
            Outcome::Failure(_) => None,
        }
    }

    /// Returns the error if the task failed.
    pub fn error(&self) -> Option<&TaskError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Whether the task succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Lifecycle of a task as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Created, not yet handed to an executor.
    Queued,
    /// Handed to the executor, waiting for a worker.
    Dispatched,
    /// A worker is executing the task body.
    Running,
    /// Finished with stats.
    Completed,
    /// Finished with an error.
    Failed,
}

impl TaskState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}
