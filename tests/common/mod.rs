//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use oncommit_task::{Task, TaskCall, TaskError};

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn add() -> Task {
    Task::sync("add", |call: &TaskCall| -> Result<i64, TaskError> {
        Ok(call.arg::<i64>(0)? + call.arg::<i64>(1)?)
    })
}

pub fn divide() -> Task {
    Task::sync("divide", |call: &TaskCall| -> anyhow::Result<i64> {
        let (a, b) = (call.arg::<i64>(0)?, call.arg::<i64>(1)?);
        a.checked_div(b)
            .ok_or_else(|| anyhow::anyhow!("cannot divide {} by {}", a, b))
    })
}

/// Task that counts its executions and returns the running total.
pub fn counting(counter: Arc<AtomicUsize>) -> Task {
    Task::sync("count", move |_: &TaskCall| {
        Ok::<_, TaskError>(counter.fetch_add(1, Ordering::SeqCst) + 1)
    })
}
