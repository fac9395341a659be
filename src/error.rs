use std::io;
use thiserror::Error;

/// Error type for worker pool operations.
///
/// Failures of individual tasks are not represented here; they are
/// captured per result as a [`TaskError`](crate::TaskError).
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool was configured with values it cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO error, typically the OS refusing to spawn a thread.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error while rendering a batch.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The underlying executor could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Result type alias for worker pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
