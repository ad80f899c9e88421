//! # Immediate Task Backend
//!
//! **Runs tasks inline, or once the enclosing transaction commits.**
//!
//! [`ImmediateBackend::enqueue`] validates a [`Task`](oncommit_task::Task),
//! normalizes its arguments into a new `NEW` result and then either executes
//! it on the calling thread or, when the task is deferred and a transaction is
//! open, registers the execution as a commit callback.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use oncommit_backend::prelude::*;
//! use oncommit_task::prelude::*;
//!
//! let add = Task::sync("add", |call: &TaskCall| -> Result<i64, TaskError> {
//!     Ok(call.arg::<i64>(0)? + call.arg::<i64>(1)?)
//! });
//!
//! let transactions = Arc::new(TransactionManager::new());
//! let backend = ImmediateBackend::new(BackendConfig::default())
//!     .with_registrar(transactions.clone());
//!
//! // Outside a transaction the task runs before enqueue returns.
//! let now = backend.enqueue(&add, &(2, 3), &()).unwrap();
//! assert_eq!(now.status(), ResultStatus::Complete);
//!
//! // Inside one it waits for the commit.
//! let atomic = transactions.atomic();
//! let later = backend.enqueue(&add, &(2, 3), &()).unwrap();
//! assert_eq!(later.status(), ResultStatus::New);
//! atomic.commit().unwrap();
//! assert_eq!(later.status(), ResultStatus::Complete);
//! ```
//!
//! ## Architecture
//!
//! - **`TaskBackend` trait**: feature-driven validation, deferral policy, enqueue
//! - **`ImmediateBackend`**: no queue, no workers; executes on the caller's thread
//! - **`CommitRegistrar`**: commit-hook seam (`Autocommit`, `TransactionManager`)
//! - **`SyncBridge`**: runs async task bodies to completion (`RuntimeBridge`)

pub mod bridge;
pub mod config;
pub mod immediate;
pub mod prelude;
pub mod traits;
pub mod transaction;

pub use bridge::{RuntimeBridge, SyncBridge};
pub use config::{BackendConfig, DEFAULT_BACKEND_ALIAS};
pub use immediate::ImmediateBackend;
pub use traits::{BackendFeatures, TaskBackend};
pub use transaction::{Atomic, Autocommit, CommitCallback, CommitRegistrar, TransactionManager};

/// Create an immediate backend with default configuration.
pub fn create_default_backend() -> ImmediateBackend {
    ImmediateBackend::default()
}
