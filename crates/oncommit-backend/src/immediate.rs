//! Immediate backend: runs tasks inline or right after the enclosing commit.
//!
//! There is no queue and no worker: a task runs on the thread that enqueues
//! it, or on the thread that commits the transaction it was deferred to.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use oncommit_task::{
    ResultWriter, Task, TaskError, TaskFailure, TaskFn, TaskOutcome, TaskResult, normalize_args,
    normalize_kwargs,
};

use crate::bridge::{RuntimeBridge, SyncBridge};
use crate::config::BackendConfig;
use crate::traits::{BackendFeatures, TaskBackend};
use crate::transaction::{Autocommit, CommitRegistrar};

/// Backend that executes tasks synchronously.
///
/// Deferred tasks return a `NEW` result; the outcome is recorded on the
/// same shared record once the transaction commits. If the transaction
/// rolls back the record stays `NEW`; nothing here cleans it up.
///
/// Execution is only reachable through [`TaskBackend::enqueue`]; callers
/// cannot run a record early:
///
/// ```rust,compile_fail
/// use oncommit_backend::prelude::*;
/// use oncommit_task::TaskResult;
///
/// fn run_early(backend: &ImmediateBackend, result: &TaskResult) {
///     backend.execute(result);
/// }
/// ```
#[derive(Clone)]
pub struct ImmediateBackend {
    config: BackendConfig,
    registrar: Arc<dyn CommitRegistrar>,
    bridge: Arc<dyn SyncBridge>,
}

impl ImmediateBackend {
    /// Create a backend outside any transaction, bridging async tasks with Tokio.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            registrar: Arc::new(Autocommit),
            bridge: Arc::new(RuntimeBridge::new()),
        }
    }

    /// Use `registrar` to find the active transaction and defer to its commit.
    pub fn with_registrar(mut self, registrar: Arc<dyn CommitRegistrar>) -> Self {
        self.registrar = registrar;
        self
    }

    /// Use `bridge` to run async task bodies.
    pub fn with_bridge(mut self, bridge: Arc<dyn SyncBridge>) -> Self {
        self.bridge = bridge;
        self
    }
}

impl Default for ImmediateBackend {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl std::fmt::Debug for ImmediateBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TaskBackend for ImmediateBackend {
    fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn features(&self) -> BackendFeatures {
        BackendFeatures {
            supports_defer: false,
            supports_async_task: true,
            supports_get_result: false,
        }
    }

    fn enqueue<A, K>(&self, task: &Task, args: &A, kwargs: &K) -> Result<TaskResult, TaskError>
    where
        A: Serialize + ?Sized,
        K: Serialize + ?Sized,
    {
        self.validate_task(task)?;

        let args = normalize_args(args)?;
        let kwargs = normalize_kwargs(kwargs)?;

        let (result, writer) = TaskResult::new(
            task.clone(),
            Uuid::new_v4().to_string(),
            args,
            kwargs,
            self.alias(),
        );

        if self.enqueue_on_commit_for(task) && self.registrar.in_transaction() {
            debug!(
                task = %task.name(),
                result_id = %result.id(),
                "Deferring task until transaction commit"
            );
            let deferred = result.clone();
            let bridge = Arc::clone(&self.bridge);
            self.registrar.on_commit(Box::new(move || {
                execute_task(&deferred, writer, bridge.as_ref())
            }));
        } else {
            execute_task(&result, writer, self.bridge.as_ref());
        }

        Ok(result)
    }
}

/// Call the task body inside the failure boundary.
fn run_body(result: &TaskResult, bridge: &dyn SyncBridge) -> TaskOutcome {
    let call = result.to_call();
    match result.task().func() {
        TaskFn::Sync(body) => {
            let body = Arc::clone(body);
            panic::catch_unwind(AssertUnwindSafe(move || body(&call)))
                .unwrap_or_else(|payload| Err(TaskFailure::from_panic(payload)))
        }
        TaskFn::Async(body) => {
            let body = Arc::clone(body);
            let future = async move {
                // Creating the future runs user code too.
                let future = panic::catch_unwind(AssertUnwindSafe(move || body(call)))
                    .map_err(TaskFailure::from_panic)?;
                AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(TaskFailure::from_panic(payload)))
            };
            // Bridge panics are task failures too.
            panic::catch_unwind(AssertUnwindSafe(|| bridge.block_on(future.boxed())))
                .unwrap_or_else(|payload| Err(TaskFailure::from_panic(payload)))
        }
    }
}

/// Execute the task behind `result` and record its outcome.
///
/// Never fails and never panics: whatever the body does ends up as the
/// record's terminal status.
fn execute_task(result: &TaskResult, writer: ResultWriter, bridge: &dyn SyncBridge) {
    debug!(
        task = %result.task().name(),
        result_id = %result.id(),
        is_async = result.task().is_async(),
        "Executing task"
    );

    let outcome = run_body(result, bridge);
    if let Err(failure) = &outcome {
        warn!(
            task = %result.task().name(),
            result_id = %result.id(),
            error = %failure,
            "Task failed"
        );
    }

    match writer.record(&outcome) {
        Ok(status) => {
            debug!(result_id = %result.id(), status = %status, "Task finished");
        }
        Err(e) => {
            warn!(result_id = %result.id(), error = %e, "Discarding outcome for finished task");
        }
    }
}
