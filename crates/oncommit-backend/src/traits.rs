//! Core task backend trait.
//!
//! Backends declare the task features they support through
//! [`BackendFeatures`]; the default [`TaskBackend::validate_task`] rejects
//! tasks that need anything else before a result record is created.

use serde::Serialize;

use oncommit_task::{MAX_PRIORITY, MIN_PRIORITY, Task, TaskError, TaskResult};

use crate::config::BackendConfig;

/// Task features a backend can honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendFeatures {
    /// Tasks may request a `run_after` time
    pub supports_defer: bool,
    /// Tasks may have async bodies
    pub supports_async_task: bool,
    /// Results can be fetched again by id
    pub supports_get_result: bool,
}

/// Core trait for task backends.
pub trait TaskBackend: Send + Sync {
    fn config(&self) -> &BackendConfig;

    fn features(&self) -> BackendFeatures;

    /// Alias stamped into every result this backend produces.
    fn alias(&self) -> &str {
        &self.config().alias
    }

    /// Check that this backend can run `task`.
    fn validate_task(&self, task: &Task) -> Result<(), TaskError> {
        let features = self.features();

        if task.is_async() && !features.supports_async_task {
            return Err(TaskError::InvalidTask(format!(
                "backend '{}' does not support async task '{}'",
                self.alias(),
                task.name()
            )));
        }

        if task.run_after().is_some() && !features.supports_defer {
            return Err(TaskError::InvalidTask(format!(
                "backend '{}' does not support run_after (task '{}')",
                self.alias(),
                task.name()
            )));
        }

        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&task.priority()) {
            return Err(TaskError::InvalidTask(format!(
                "priority {} of task '{}' is outside {}..={}",
                task.priority(),
                task.name(),
                MIN_PRIORITY,
                MAX_PRIORITY
            )));
        }

        if !self.config().allows_queue(task.queue_name()) {
            return Err(TaskError::InvalidTask(format!(
                "queue '{}' is not configured on backend '{}'",
                task.queue_name(),
                self.alias()
            )));
        }

        Ok(())
    }

    /// Whether `task` should wait for the active transaction to commit.
    ///
    /// The task's own setting wins over the backend default.
    fn enqueue_on_commit_for(&self, task: &Task) -> bool {
        task.enqueue_on_commit().unwrap_or(self.config().enqueue_on_commit)
    }

    /// Enqueue `task` with positional `args` and keyword `kwargs`.
    ///
    /// Errors only for validation and argument normalization; execution
    /// failures are recorded on the returned result.
    fn enqueue<A, K>(&self, task: &Task, args: &A, kwargs: &K) -> Result<TaskResult, TaskError>
    where
        A: Serialize + ?Sized,
        K: Serialize + ?Sized;

    /// Fetch a previously enqueued result by id.
    fn get_result(&self, _result_id: &str) -> Result<TaskResult, TaskError> {
        Err(TaskError::Unsupported("get_result"))
    }
}
