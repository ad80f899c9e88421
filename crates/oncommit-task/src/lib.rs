//! # Task Descriptors and Result Records
//!
//! **Leaf data model for commit-aware task execution.**
//!
//! A [`Task`] is a callable (synchronous or asynchronous, fixed at definition)
//! plus declared configuration. Enqueuing a task on a backend produces a
//! [`TaskResult`]: a record of one invocation whose status moves once from
//! `NEW` to `COMPLETE` or `FAILED`.
//!
//! ## Quick Start
//!
//! ```rust
//! use oncommit_task::prelude::*;
//! use serde_json::json;
//!
//! let add = Task::sync("add", |call: &TaskCall| -> Result<i64, TaskError> {
//!     Ok(call.arg::<i64>(0)? + call.arg::<i64>(1)?)
//! });
//!
//! let args = normalize_args(&(2, 3)).unwrap();
//! let (result, writer) = TaskResult::new(add, "example", args, Default::default(), "default");
//! assert_eq!(result.status(), ResultStatus::New);
//!
//! writer.record(&Ok(json!(5))).unwrap();
//! assert_eq!(result.return_value().unwrap(), json!(5));
//! ```
//!
//! ## Architecture
//!
//! - **`Task` / `TaskFn`**: descriptor and tagged callable (`Sync` | `Async`)
//! - **`TaskResult`** / **`ResultWriter`**: read-only shared record handle and
//!   its single, consumable outcome writer
//! - **`status`**: `NEW -> COMPLETE | FAILED` state machine
//! - **`normalize`**: JSON normalization for arguments and return values

pub mod error;
pub mod normalize;
pub mod prelude;
pub mod result;
pub mod status;
pub mod task;

pub use error::{TaskError, TaskFailure};
pub use normalize::{normalize, normalize_args, normalize_kwargs};
pub use result::{ResultWriter, TaskResult, TaskResultSnapshot};
pub use status::{ResultStatus, is_terminal, validate_transition};
pub use task::{
    DEFAULT_PRIORITY, DEFAULT_QUEUE_NAME, MAX_PRIORITY, MIN_PRIORITY, Task, TaskCall, TaskFn,
    TaskOutcome,
};
