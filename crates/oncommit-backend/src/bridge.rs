//! Synchronous bridge: drives async task bodies to completion on a blocked caller.

use futures::future::BoxFuture;
use tokio::runtime::{Builder, Handle};
use tracing::debug;

use oncommit_task::{TaskFailure, TaskOutcome};

/// Runs an async task body to completion, blocking the calling thread.
pub trait SyncBridge: Send + Sync {
    fn block_on(&self, future: BoxFuture<'static, TaskOutcome>) -> TaskOutcome;
}

/// Tokio-backed bridge.
///
/// Each call gets its own current-thread runtime, dropped before returning,
/// so no task spawned by the body outlives the call. A thread that is already
/// inside a Tokio runtime cannot block on another one, so in that case the
/// future is driven on a scoped helper thread while the caller waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeBridge;

impl RuntimeBridge {
    pub fn new() -> Self {
        Self
    }

    fn run_to_completion(future: BoxFuture<'static, TaskOutcome>) -> TaskOutcome {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TaskFailure::Bridge(format!("failed to build runtime: {}", e)))?;
        runtime.block_on(future)
    }
}

impl SyncBridge for RuntimeBridge {
    fn block_on(&self, future: BoxFuture<'static, TaskOutcome>) -> TaskOutcome {
        if Handle::try_current().is_err() {
            return Self::run_to_completion(future);
        }

        debug!("Caller is inside a runtime; bridging on a helper thread");
        std::thread::scope(|scope| {
            scope
                .spawn(move || Self::run_to_completion(future))
                .join()
                .unwrap_or_else(|payload| Err(TaskFailure::from_panic(payload)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::time::Duration;

    fn sleepy_outcome() -> BoxFuture<'static, TaskOutcome> {
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let joined = tokio::spawn(async { 40 + 2 })
                .await
                .map_err(|e| TaskFailure::Raised(e.to_string()))?;
            Ok::<_, TaskFailure>(json!(joined))
        }
        .boxed()
    }

    #[test]
    fn test_block_on_outside_runtime() {
        assert_eq!(RuntimeBridge::new().block_on(sleepy_outcome()), Ok(json!(42)));
    }

    #[tokio::test]
    async fn test_block_on_inside_current_thread_runtime() {
        assert_eq!(RuntimeBridge::new().block_on(sleepy_outcome()), Ok(json!(42)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_inside_multi_thread_runtime() {
        assert_eq!(RuntimeBridge::new().block_on(sleepy_outcome()), Ok(json!(42)));
    }

    #[test]
    fn test_failure_outcome_passes_through() {
        let outcome = RuntimeBridge::new()
            .block_on(async { Err(TaskFailure::Raised("nope".into())) }.boxed());
        assert_eq!(outcome, Err(TaskFailure::Raised("nope".into())));
    }
}
