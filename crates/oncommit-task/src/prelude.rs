//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use oncommit_task::prelude::*;
//! ```

pub use crate::error::{TaskError, TaskFailure};
pub use crate::normalize::{normalize, normalize_args, normalize_kwargs};
pub use crate::result::{ResultWriter, TaskResult, TaskResultSnapshot};
pub use crate::status::{ResultStatus, is_terminal, validate_transition};
pub use crate::task::{Task, TaskCall, TaskFn, TaskOutcome};
