//! # Task Lifecycle Integration Tests
//!
//! Immediate execution through `ImmediateBackend`: every result returned
//! without deferral is already terminal, and the record captures inputs,
//! outcome and timestamps.

mod common;

use std::collections::HashMap;

use oncommit_backend::{BackendConfig, ImmediateBackend, TaskBackend, create_default_backend};
use oncommit_task::{ResultStatus, Task, TaskCall, TaskError, normalize};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Greeting<'a> {
    name: &'a str,
    excited: bool,
}

#[test]
fn test_add_completes_inline() {
    common::init_tracing();
    let backend = create_default_backend();

    let result = backend.enqueue(&common::add(), &(2, 3), &()).unwrap();

    assert_eq!(result.status(), ResultStatus::Complete);
    assert_eq!(result.result(), Some(json!(5)));
    assert_eq!(result.args(), &[json!(2), json!(3)]);
    assert!(result.kwargs().is_empty());
    assert!(result.finished_at().unwrap() >= result.enqueued_at());
    assert_eq!(result.return_value().unwrap(), json!(5));
}

#[test]
fn test_divide_by_zero_fails_without_propagating() {
    common::init_tracing();
    let backend = create_default_backend();

    let result = backend.enqueue(&common::divide(), &(1, 0), &()).unwrap();

    assert_eq!(result.status(), ResultStatus::Failed);
    assert_eq!(result.result(), None);
    assert!(result.finished_at().is_some());
    assert!(matches!(
        result.return_value(),
        Err(TaskError::ResultFailed(_))
    ));
}

#[test]
fn test_inline_results_are_never_new() {
    let backend = ImmediateBackend::new(BackendConfig::default().with_enqueue_on_commit(false));
    let tasks = [
        common::add(),
        common::divide(),
        Task::sync("explode", |_: &TaskCall| -> Result<(), TaskError> {
            panic!("kaboom")
        }),
        Task::sync("pairs", |_: &TaskCall| {
            Ok::<_, TaskError>(HashMap::from([((1, 2), 3)]))
        }),
    ];

    for task in &tasks {
        for args in [(4, 2), (1, 0)] {
            let result = backend.enqueue(task, &args, &()).unwrap();
            assert_ne!(result.status(), ResultStatus::New, "task {}", task.name());
            assert!(result.finished_at().is_some());
            if result.status() == ResultStatus::Failed {
                assert!(result.result().is_none());
            }
        }
    }
}

#[test]
fn test_unserializable_return_value_fails() {
    let task = Task::sync("pairs", |_: &TaskCall| {
        Ok::<_, TaskError>(HashMap::from([((1, 2), 3)]))
    });
    let result = create_default_backend().enqueue(&task, &(), &()).unwrap();
    assert_eq!(result.status(), ResultStatus::Failed);
    assert!(result.result().is_none());
}

#[test]
fn test_kwargs_are_captured_and_passed() {
    let greet = Task::sync("greet", |call: &TaskCall| -> Result<String, TaskError> {
        let name: String = call.kwarg("name")?;
        let mark = if call.kwarg::<bool>("excited")? { "!" } else { "." };
        Ok(format!("hello {}{}", name, mark))
    });

    let result = create_default_backend()
        .enqueue(
            &greet,
            &(),
            &Greeting {
                name: "ada",
                excited: true,
            },
        )
        .unwrap();

    assert_eq!(result.kwargs().get("name"), Some(&json!("ada")));
    assert_eq!(result.result(), Some(json!("hello ada!")));
}

#[test]
fn test_normalized_inputs_are_stable() {
    let args = (1.5, "x", vec![Some(1), None]);
    let result = create_default_backend()
        .enqueue(
            &Task::sync("echo", |call: &TaskCall| Ok::<_, TaskError>(call.args.clone())),
            &args,
            &(),
        )
        .unwrap();

    let recorded = json!(result.args());
    assert_eq!(normalize(&recorded).unwrap(), recorded);
    assert_eq!(result.result(), Some(json!([1.5, "x", [1, null]])));
}

#[test]
fn test_snapshot_is_durable_shaped() {
    let backend = ImmediateBackend::new(BackendConfig::default().with_alias("inline"));
    let result = backend.enqueue(&common::add(), &[20, 22], &()).unwrap();

    let snapshot = result.snapshot();
    assert_eq!(snapshot.backend, "inline");
    assert_eq!(snapshot.status, ResultStatus::Complete);

    let wire = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(wire["taskName"], json!("add"));
    assert_eq!(wire["queueName"], json!("default"));
    assert_eq!(wire["result"], json!(42));

    let parsed: oncommit_task::TaskResultSnapshot = serde_json::from_value(wire).unwrap();
    assert_eq!(parsed, snapshot);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_task_from_async_caller() {
    let fetch = Task::asynchronous("fetch", |call: TaskCall| async move {
        let id: u64 = call.arg(0)?;
        let handle = tokio::spawn(async move { id * 10 });
        let scaled = handle.await.map_err(|e| anyhow::anyhow!(e))?;
        Ok::<_, anyhow::Error>(json!({ "id": id, "scaled": scaled }))
    });

    let result = create_default_backend().enqueue(&fetch, &[7], &()).unwrap();
    assert_eq!(result.status(), ResultStatus::Complete);
    assert_eq!(result.result(), Some(json!({"id": 7, "scaled": 70})));
}
