//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use oncommit_backend::prelude::*;
//! ```

pub use crate::bridge::{RuntimeBridge, SyncBridge};
pub use crate::config::BackendConfig;
pub use crate::immediate::ImmediateBackend;
pub use crate::traits::{BackendFeatures, TaskBackend};
pub use crate::transaction::{Atomic, Autocommit, CommitRegistrar, TransactionManager};
