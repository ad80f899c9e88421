//! Unified error types for task definition, normalization and result access.

use crate::status::ResultStatus;

/// Unified error type for task operations.
///
/// Only enqueue-time problems (validation, argument normalization) and
/// caller-side misuse surface as `TaskError`. Failures that happen while a
/// task body runs are captured as [`TaskFailure`] inside the result record.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Invalid task argument: {0}")]
    Argument(String),

    #[error("Invalid status transition: {current:?} -> {requested:?}")]
    InvalidTransition {
        current: ResultStatus,
        requested: ResultStatus,
    },

    #[error("Task result is in terminal state: {0:?}")]
    TerminalState(ResultStatus),

    #[error("Task result {id} has not finished (status {status:?})")]
    ResultNotReady { id: String, status: ResultStatus },

    #[error("Task result {0} failed")]
    ResultFailed(String),

    #[error("Backend does not support {0}")]
    Unsupported(&'static str),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Normalization(err.to_string())
    }
}

/// Why a task execution ended in `FAILED`.
///
/// Produced by the execution boundary, never propagated to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    /// The task body returned an error
    #[error("task raised: {0}")]
    Raised(String),

    /// The task body panicked
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The return value could not be normalized
    #[error("return value not serializable: {0}")]
    Normalization(String),

    /// The async bridge could not drive the task to completion
    #[error("sync bridge failure: {0}")]
    Bridge(String),
}

impl TaskFailure {
    /// Build a `Panicked` failure from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskFailure::Panicked(message)
    }
}
