//! Task descriptors.
//!
//! A [`Task`] pairs a callable with its declared configuration. Whether the
//! callable is synchronous or asynchronous is fixed when the task is defined
//! ([`TaskFn`]); backends never inspect the callable at call time.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{TaskError, TaskFailure};
use crate::normalize::normalize;

/// Queue used when a task does not name one.
pub const DEFAULT_QUEUE_NAME: &str = "default";
/// Priority used when a task does not set one.
pub const DEFAULT_PRIORITY: i32 = 0;
/// Lowest accepted priority.
pub const MIN_PRIORITY: i32 = -100;
/// Highest accepted priority.
pub const MAX_PRIORITY: i32 = 100;

/// Outcome of one task body invocation, already normalized.
pub type TaskOutcome = Result<Value, TaskFailure>;

type SyncBody = dyn Fn(&TaskCall) -> TaskOutcome + Send + Sync;
type AsyncBody = dyn Fn(TaskCall) -> BoxFuture<'static, TaskOutcome> + Send + Sync;

/// The callable behind a task, tagged by calling convention.
#[derive(Clone)]
pub enum TaskFn {
    /// Invoked directly on the executing thread
    Sync(Arc<SyncBody>),
    /// Driven to completion through a synchronous bridge
    Async(Arc<AsyncBody>),
}

impl TaskFn {
    pub fn is_async(&self) -> bool {
        matches!(self, TaskFn::Async(_))
    }
}

impl fmt::Debug for TaskFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFn::Sync(_) => f.write_str("TaskFn::Sync(..)"),
            TaskFn::Async(_) => f.write_str("TaskFn::Async(..)"),
        }
    }
}

/// Arguments handed to a task body.
///
/// An owned copy of the normalized arguments stored on the result record, so
/// a body can never alter the recorded inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCall {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl TaskCall {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { args, kwargs }
    }

    /// Decode the positional argument at `index`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, TaskError> {
        let value = self.args.get(index).ok_or_else(|| {
            TaskError::Argument(format!(
                "missing positional argument {} (got {})",
                index,
                self.args.len()
            ))
        })?;
        serde_json::from_value(value.clone())
            .map_err(|e| TaskError::Argument(format!("positional argument {}: {}", index, e)))
    }

    /// Decode the keyword argument `name`.
    pub fn kwarg<T: DeserializeOwned>(&self, name: &str) -> Result<T, TaskError> {
        let value = self
            .kwargs
            .get(name)
            .ok_or_else(|| TaskError::Argument(format!("missing keyword argument '{}'", name)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| TaskError::Argument(format!("keyword argument '{}': {}", name, e)))
    }

    /// Decode an optional keyword argument, `None` when absent or null.
    pub fn kwarg_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, TaskError> {
        match self.kwargs.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.kwarg(name).map(Some),
        }
    }
}

fn into_outcome<R: Serialize, E: fmt::Display>(returned: Result<R, E>) -> TaskOutcome {
    match returned {
        Ok(value) => normalize(&value).map_err(|e| match e {
            TaskError::Normalization(msg) => TaskFailure::Normalization(msg),
            other => TaskFailure::Normalization(other.to_string()),
        }),
        Err(e) => Err(TaskFailure::Raised(e.to_string())),
    }
}

/// A named unit of work plus its declared configuration.
#[derive(Clone)]
pub struct Task {
    name: String,
    func: TaskFn,
    priority: i32,
    queue_name: String,
    run_after: Option<DateTime<Utc>>,
    enqueue_on_commit: Option<bool>,
}

impl Task {
    /// Define a task with an explicit callable.
    pub fn new(name: impl Into<String>, func: TaskFn) -> Self {
        Self {
            name: name.into(),
            func,
            priority: DEFAULT_PRIORITY,
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            run_after: None,
            enqueue_on_commit: None,
        }
    }

    /// Define a task from a synchronous function.
    ///
    /// The return value is normalized after the call; a value that cannot be
    /// normalized becomes a [`TaskFailure::Normalization`].
    pub fn sync<F, R, E>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TaskCall) -> Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: fmt::Display,
    {
        Self::new(
            name,
            TaskFn::Sync(Arc::new(move |call: &TaskCall| into_outcome(f(call)))),
        )
    }

    /// Define a task from an async function.
    pub fn asynchronous<F, Fut, R, E>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TaskCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Serialize + 'static,
        E: fmt::Display + 'static,
    {
        Self::new(
            name,
            TaskFn::Async(Arc::new(move |call: TaskCall| {
                f(call).map(into_outcome).boxed()
            })),
        )
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    pub fn with_run_after(mut self, run_after: DateTime<Utc>) -> Self {
        self.run_after = Some(run_after);
        self
    }

    /// Override the backend's enqueue-on-commit default for this task.
    pub fn with_enqueue_on_commit(mut self, enqueue_on_commit: bool) -> Self {
        self.enqueue_on_commit = Some(enqueue_on_commit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn func(&self) -> &TaskFn {
        &self.func
    }

    pub fn is_async(&self) -> bool {
        self.func.is_async()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn run_after(&self) -> Option<DateTime<Utc>> {
        self.run_after
    }

    pub fn enqueue_on_commit(&self) -> Option<bool> {
        self.enqueue_on_commit
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("func", &self.func)
            .field("priority", &self.priority)
            .field("queue_name", &self.queue_name)
            .field("run_after", &self.run_after)
            .field("enqueue_on_commit", &self.enqueue_on_commit)
            .finish()
    }
}
