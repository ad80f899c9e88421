//! # Enqueue Demo
//!
//! Enqueues an `add` task and an async `slow_double` task on an
//! `ImmediateBackend`, optionally inside a transaction that is then committed
//! or rolled back, and prints the resulting records as JSON.
//!
//! ## Usage
//! ```bash
//! cargo run -p enqueue-demo -- 2 3
//! cargo run -p enqueue-demo -- 2 3 --in-transaction
//! cargo run -p enqueue-demo -- 2 3 --in-transaction --rollback
//! RUST_LOG=debug cargo run -p enqueue-demo -- 1 0 --config backend.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oncommit_backend::prelude::*;
use oncommit_task::prelude::*;

#[derive(Parser)]
#[command(name = "enqueue-demo")]
#[command(about = "Run tasks inline or after a transaction commits")]
struct Args {
    /// First operand
    a: i64,

    /// Second operand
    b: i64,

    /// Backend configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enqueue inside a transaction
    #[arg(long)]
    in_transaction: bool,

    /// Roll the transaction back instead of committing it
    #[arg(long, requires = "in_transaction")]
    rollback: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BackendConfig> {
    let Some(path) = path else {
        return Ok(BackendConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(BackendConfig::from_toml_str(&source)?)
}

fn tasks() -> Vec<Task> {
    let add = Task::sync("add", |call: &TaskCall| -> anyhow::Result<i64> {
        let (a, b): (i64, i64) = (call.arg(0)?, call.arg(1)?);
        a.checked_add(b).context("overflow")
    });
    let slow_double = Task::asynchronous("slow_double", |call: TaskCall| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (a, b): (i64, i64) = (call.arg(0)?, call.arg(1)?);
        a.checked_div(b)
            .map(|q| q * 2)
            .context("division by zero")
    });
    vec![add, slow_double]
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    info!(alias = %config.alias, enqueue_on_commit = config.enqueue_on_commit, "Loaded backend config");

    let transactions = Arc::new(TransactionManager::new());
    let backend = ImmediateBackend::new(config).with_registrar(transactions.clone());

    let atomic = args.in_transaction.then(|| transactions.atomic());
    let results = tasks()
        .iter()
        .map(|task| backend.enqueue(task, &(args.a, args.b), &()))
        .collect::<Result<Vec<_>, _>>()?;

    for result in &results {
        info!(task = %result.task().name(), status = %result.status(), "Enqueued");
    }

    match atomic {
        Some(atomic) if args.rollback => {
            atomic.rollback();
            info!("Transaction rolled back");
        }
        Some(atomic) => {
            atomic.commit()?;
            info!("Transaction committed");
        }
        None => {}
    }

    let snapshots: Vec<_> = results.iter().map(TaskResult::snapshot).collect();
    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}
