//! Task result records.
//!
//! A [`TaskResult`] tracks one invocation of a task. Identity, inputs and the
//! enqueue timestamp are fixed at construction. Status, result value and
//! finish timestamp live behind a lock and change exactly once, through the
//! [`ResultWriter`] handed to whoever created the record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::status::{self, ResultStatus};
use crate::task::{Task, TaskCall, TaskOutcome};

#[derive(Debug)]
struct ResultState {
    status: ResultStatus,
    result: Option<Value>,
    finished_at: Option<DateTime<Utc>>,
}

/// Handle to the record of one task invocation.
///
/// Cloning the handle shares the record; the outcome recorded by the backend
/// is visible through every clone. The handle itself is read-only:
///
/// ```rust,compile_fail
/// use oncommit_task::prelude::*;
///
/// fn forge(result: &TaskResult) {
///     result.record_outcome(&Ok(serde_json::Value::Null));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TaskResult {
    task: Task,
    id: String,
    enqueued_at: DateTime<Utc>,
    args: Arc<Vec<Value>>,
    kwargs: Arc<Map<String, Value>>,
    backend: String,
    state: Arc<RwLock<ResultState>>,
}

/// Point-in-time, serializable view of a [`TaskResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResultSnapshot {
    pub id: String,
    pub task_name: String,
    pub queue_name: String,
    pub priority: i32,
    pub status: ResultStatus,
    pub enqueued_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub result: Option<Value>,
    pub backend: String,
}

impl TaskResult {
    /// Create a record in `NEW` status, stamped with the current time.
    ///
    /// The returned [`ResultWriter`] is the only way to record the outcome;
    /// the executing backend keeps it and hands out the `TaskResult`.
    pub fn new(
        task: Task,
        id: impl Into<String>,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        backend: impl Into<String>,
    ) -> (Self, ResultWriter) {
        let result = Self {
            task,
            id: id.into(),
            enqueued_at: Utc::now(),
            args: Arc::new(args),
            kwargs: Arc::new(kwargs),
            backend: backend.into(),
            state: Arc::new(RwLock::new(ResultState {
                status: ResultStatus::New,
                result: None,
                finished_at: None,
            })),
        };
        let writer = ResultWriter {
            state: Arc::clone(&result.state),
        };
        (result, writer)
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    /// Alias of the backend that produced this record.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn status(&self) -> ResultStatus {
        self.state.read().status
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().finished_at
    }

    /// The normalized return value; only present once `COMPLETE`.
    pub fn result(&self) -> Option<Value> {
        self.state.read().result.clone()
    }

    pub fn is_finished(&self) -> bool {
        status::is_terminal(self.status())
    }

    /// The return value of a completed task.
    pub fn return_value(&self) -> Result<Value, TaskError> {
        let state = self.state.read();
        match state.status {
            ResultStatus::Complete => Ok(state.result.clone().unwrap_or(Value::Null)),
            ResultStatus::Failed => Err(TaskError::ResultFailed(self.id.clone())),
            ResultStatus::New => Err(TaskError::ResultNotReady {
                id: self.id.clone(),
                status: state.status,
            }),
        }
    }

    /// Fresh copy of the recorded inputs for a task body.
    pub fn to_call(&self) -> TaskCall {
        TaskCall::new(self.args.as_ref().clone(), self.kwargs.as_ref().clone())
    }

    pub fn snapshot(&self) -> TaskResultSnapshot {
        let state = self.state.read();
        TaskResultSnapshot {
            id: self.id.clone(),
            task_name: self.task.name().to_string(),
            queue_name: self.task.queue_name().to_string(),
            priority: self.task.priority(),
            status: state.status,
            enqueued_at: self.enqueued_at,
            finished_at: state.finished_at,
            args: self.args.as_ref().clone(),
            kwargs: self.kwargs.as_ref().clone(),
            result: state.result.clone(),
            backend: self.backend.clone(),
        }
    }
}

/// Sole write access to a [`TaskResult`]'s outcome.
///
/// Not `Clone`, and consumed by [`ResultWriter::record`], so an outcome is
/// recorded at most once and only by the holder.
#[derive(Debug)]
pub struct ResultWriter {
    state: Arc<RwLock<ResultState>>,
}

impl ResultWriter {
    /// Record the terminal outcome of the execution.
    ///
    /// Sets status, result and `finished_at` together under one write lock.
    pub fn record(self, outcome: &TaskOutcome) -> Result<ResultStatus, TaskError> {
        let next = match outcome {
            Ok(_) => ResultStatus::Complete,
            Err(_) => ResultStatus::Failed,
        };

        let mut state = self.state.write();
        status::validate_transition(state.status, next)?;

        state.result = outcome.as_ref().ok().cloned();
        state.status = next;
        state.finished_at = Some(Utc::now());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskFailure;
    use serde_json::json;

    fn make_result() -> (TaskResult, ResultWriter) {
        let task = Task::sync("add", |call: &TaskCall| -> Result<i64, TaskError> {
            Ok(call.arg::<i64>(0)? + call.arg::<i64>(1)?)
        });
        TaskResult::new(task, "result-1", vec![json!(2), json!(3)], Map::new(), "default")
    }

    #[test]
    fn test_new_record() {
        let (result, _writer) = make_result();
        assert_eq!(result.id(), "result-1");
        assert_eq!(result.status(), ResultStatus::New);
        assert_eq!(result.args(), &[json!(2), json!(3)]);
        assert_eq!(result.backend(), "default");
        assert!(result.finished_at().is_none());
        assert!(result.result().is_none());
        assert!(!result.is_finished());
    }

    #[test]
    fn test_record_success() {
        let (result, writer) = make_result();
        let status = writer.record(&Ok(json!(5))).unwrap();
        assert_eq!(status, ResultStatus::Complete);
        assert_eq!(result.result(), Some(json!(5)));
        assert_eq!(result.return_value().unwrap(), json!(5));
        assert!(result.finished_at().unwrap() >= result.enqueued_at());
    }

    #[test]
    fn test_record_failure_clears_result() {
        let (result, writer) = make_result();
        let status = writer
            .record(&Err(TaskFailure::Raised("division by zero".into())))
            .unwrap();
        assert_eq!(status, ResultStatus::Failed);
        assert!(result.result().is_none());
        assert!(result.finished_at().is_some());
        assert!(matches!(
            result.return_value(),
            Err(TaskError::ResultFailed(id)) if id == "result-1"
        ));
    }

    #[test]
    fn test_dropped_writer_leaves_record_new() {
        let (result, writer) = make_result();
        drop(writer);
        assert_eq!(result.status(), ResultStatus::New);
        assert!(result.finished_at().is_none());
    }

    #[test]
    fn test_writer_belongs_to_its_own_record() {
        let (first, writer) = make_result();
        let (second, _) = make_result();
        writer.record(&Ok(json!(5))).unwrap();
        assert_eq!(first.status(), ResultStatus::Complete);
        assert_eq!(second.status(), ResultStatus::New);
    }

    #[test]
    fn test_clones_share_outcome() {
        let (result, writer) = make_result();
        let observer = result.clone();
        writer.record(&Ok(json!(5))).unwrap();
        assert_eq!(observer.status(), ResultStatus::Complete);
    }

    #[test]
    fn test_return_value_not_ready() {
        let (result, _writer) = make_result();
        assert!(matches!(
            result.return_value(),
            Err(TaskError::ResultNotReady {
                status: ResultStatus::New,
                ..
            })
        ));
    }

    #[test]
    fn test_call_is_a_copy() {
        let (result, _writer) = make_result();
        let mut call = result.to_call();
        call.args[0] = json!(100);
        assert_eq!(result.args()[0], json!(2));
    }

    #[test]
    fn test_snapshot_shape() {
        let (result, writer) = make_result();
        writer.record(&Ok(json!(5))).unwrap();
        let snapshot = serde_json::to_value(result.snapshot()).unwrap();
        assert_eq!(snapshot["id"], json!("result-1"));
        assert_eq!(snapshot["taskName"], json!("add"));
        assert_eq!(snapshot["status"], json!("COMPLETE"));
        assert_eq!(snapshot["args"], json!([2, 3]));
        assert_eq!(snapshot["result"], json!(5));
        assert!(snapshot["finishedAt"].is_string());
    }
}
