//! Engine tests against the in-memory store double and scripted executors.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use spinneret_engine::{ExecutionEngine, ExecutorRegistry, RetryPolicy};
use spinneret_store::{ExecutionStatus, LogLevel, PhaseStatus, Store};
use spinneret_task::{InputDef, OutputDef, ParamKind, TaskDefinition, TaskRegistry};
use spinneret_workflow::Edge;
use tokio_util::sync::CancellationToken;

use support::{
  AcquireExecutor, EchoExecutor, EmitExecutor, FailExecutor, MemoryStore, NoopExecutor, node,
  plan, workflow_record,
};

fn definitions() -> TaskRegistry {
  let mut registry = TaskRegistry::new();
  registry.register(TaskDefinition {
    task_type: "SOURCE".to_string(),
    label: "Source".to_string(),
    is_entry_point: true,
    credit_cost: 1,
    inputs: vec![],
    outputs: vec![OutputDef::new("Value", ParamKind::String)],
  });
  registry.register(TaskDefinition {
    task_type: "SINK".to_string(),
    label: "Sink".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![InputDef::required("Value", ParamKind::String)],
    outputs: vec![OutputDef::new("Value", ParamKind::String)],
  });
  registry.register(TaskDefinition {
    task_type: "ACQUIRE".to_string(),
    label: "Acquire".to_string(),
    is_entry_point: true,
    credit_cost: 2,
    inputs: vec![],
    outputs: vec![OutputDef::new("Page", ParamKind::BrowserInstance)],
  });
  registry.register(TaskDefinition {
    task_type: "BOOM".to_string(),
    label: "Boom".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![],
    outputs: vec![],
  });
  registry.register(TaskDefinition {
    task_type: "FREE".to_string(),
    label: "Free".to_string(),
    is_entry_point: true,
    credit_cost: 0,
    inputs: vec![],
    outputs: vec![],
  });
  registry
}

struct Harness {
  store: Arc<MemoryStore>,
  engine: ExecutionEngine,
  closed: Arc<AtomicUsize>,
}

fn harness() -> Harness {
  let store = Arc::new(MemoryStore::new());
  let closed = Arc::new(AtomicUsize::new(0));

  let mut executors = ExecutorRegistry::new();
  executors.register(
    "SOURCE",
    Arc::new(EmitExecutor {
      output: "Value".to_string(),
      value: json!("hello"),
    }),
  );
  executors.register("SINK", Arc::new(EchoExecutor));
  executors.register(
    "ACQUIRE",
    Arc::new(AcquireExecutor {
      closed: closed.clone(),
    }),
  );
  executors.register("BOOM", Arc::new(FailExecutor));
  executors.register("FREE", Arc::new(NoopExecutor));

  let engine = ExecutionEngine::new(
    store.clone(),
    Arc::new(definitions()),
    executors,
  )
  .with_retry_policy(RetryPolicy {
    max_attempts: 2,
    initial_backoff: Duration::from_millis(1),
    max_backoff: Duration::from_millis(2),
  });

  Harness {
    store,
    engine,
    closed,
  }
}

fn edge(source: &str, output: &str, target: &str, input: &str) -> Edge {
  Edge {
    source: source.to_string(),
    source_output: output.to_string(),
    target: target.to_string(),
    target_input: input.to_string(),
  }
}

#[tokio::test]
async fn chain_completes_and_wires_outputs() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  let plan = plan(&[
    &[node("a", "SOURCE", &[])],
    &[node("b", "SINK", &[])],
  ]);
  let edges = vec![edge("a", "Value", "b", "Value")];

  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &edges)
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Completed);
  assert_eq!(summary.credits_consumed, 2);

  let execution = h.store.get_execution(&execution_id).await.unwrap();
  assert_eq!(execution.status, ExecutionStatus::Completed);
  assert_eq!(execution.credits_consumed, 2);
  assert!(execution.started_at.is_some());
  assert!(execution.completed_at.is_some());

  let phases = h.store.list_phases(&execution_id).await.unwrap();
  assert_eq!(phases.len(), 2);
  assert!(phases.iter().all(|p| p.status == PhaseStatus::Completed));

  // The sink saw the source's recorded output.
  let sink = &phases[1];
  assert_eq!(
    sink.inputs.as_ref().map(|j| j.0.clone()),
    Some(json!({ "Value": "hello" }))
  );
  assert_eq!(
    sink.outputs.as_ref().map(|j| j.0.clone()),
    Some(json!({ "Value": "hello" }))
  );

  assert_eq!(h.store.get_balance("user-1").await.unwrap(), 8);

  // The last-run pointer followed the run to its terminal status.
  let workflow = h.store.get_workflow("wf-1").await.unwrap();
  assert_eq!(workflow.last_run_id.as_deref(), Some(execution_id.as_str()));
  assert_eq!(workflow.last_run_status, Some(ExecutionStatus::Completed));
}

#[tokio::test]
async fn insufficient_credits_stop_the_run() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 0).await.unwrap();

  let plan = plan(&[&[node("a", "SOURCE", &[])]]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Failed);
  assert_eq!(summary.credits_consumed, 0);

  let phases = h.store.list_phases(&execution_id).await.unwrap();
  assert_eq!(phases[0].status, PhaseStatus::Failed);
  assert_eq!(phases[0].credits_consumed, 0);

  let logs = h.store.list_logs(&phases[0].phase_id).await.unwrap();
  assert!(
    logs
      .iter()
      .any(|l| l.level == LogLevel::Error && l.message.contains("insufficient credits"))
  );

  assert_eq!(h.store.get_balance("user-1").await.unwrap(), 0);
}

#[tokio::test]
async fn failed_phase_stops_later_phases_and_releases_resource() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  let plan = plan(&[
    &[node("a", "ACQUIRE", &[])],
    &[node("b", "BOOM", &[])],
    &[node("c", "SOURCE", &[])],
  ]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Failed);

  let phases = h.store.list_phases(&execution_id).await.unwrap();
  assert_eq!(phases[0].status, PhaseStatus::Completed);
  assert_eq!(phases[1].status, PhaseStatus::Failed);
  // Fail fast: the third phase never reached running.
  assert_eq!(phases[2].status, PhaseStatus::Pending);
  assert!(phases[2].started_at.is_none());

  // Payment is non-refundable: the failed phase still consumed its cost.
  assert_eq!(phases[1].credits_consumed, 1);
  assert_eq!(summary.credits_consumed, 3);
  assert_eq!(h.store.get_balance("user-1").await.unwrap(), 7);

  // The shared resource was released exactly once.
  assert_eq!(h.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resource_released_on_success() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  let plan = plan(&[&[node("a", "ACQUIRE", &[])]]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Completed);
  assert_eq!(h.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_task_type_fails_the_phase() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  let plan = plan(&[&[node("a", "TELEPORT", &[])]]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Failed);
  assert_eq!(summary.credits_consumed, 0);

  let phases = h.store.list_phases(&execution_id).await.unwrap();
  assert_eq!(phases[0].status, PhaseStatus::Failed);

  let logs = h.store.list_logs(&phases[0].phase_id).await.unwrap();
  assert!(logs.iter().any(|l| l.message.contains("unknown task type")));
}

#[tokio::test]
async fn missing_upstream_output_is_logged_and_left_unset() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  // The wire points at an output the source never records.
  let plan = plan(&[
    &[node("a", "SOURCE", &[])],
    &[node("b", "SINK", &[])],
  ]);
  let edges = vec![edge("a", "Other", "b", "Value")];

  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &edges)
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Failed);

  let phases = h.store.list_phases(&execution_id).await.unwrap();
  assert_eq!(phases[1].status, PhaseStatus::Failed);
  // The input was left unset rather than defaulted.
  assert_eq!(
    phases[1].inputs.as_ref().map(|j| j.0.clone()),
    Some(json!({}))
  );

  let logs = h.store.list_logs(&phases[1].phase_id).await.unwrap();
  assert!(logs.iter().any(|l| l.message.contains("no recorded value")));
  assert!(
    logs
      .iter()
      .any(|l| l.message.contains("missing required input"))
  );
}

#[tokio::test]
async fn losing_the_last_run_pointer_is_not_an_error() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  let plan = plan(&[&[node("a", "SOURCE", &[])]]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();

  // A newer run takes the pointer over before this run finalizes.
  h.store
    .set_last_run("wf-1", "newer-run", ExecutionStatus::Pending, chrono::Utc::now())
    .await
    .unwrap();

  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(summary.status, ExecutionStatus::Completed);

  // The newer run's pointer was left alone.
  let workflow = h.store.get_workflow("wf-1").await.unwrap();
  assert_eq!(workflow.last_run_id.as_deref(), Some("newer-run"));
  assert_eq!(workflow.last_run_status, Some(ExecutionStatus::Pending));
}

#[tokio::test]
async fn zero_cost_task_skips_the_paywall() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  // No balance row at all.

  let plan = plan(&[&[node("a", "FREE", &[])]]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();
  let summary = h
    .engine
    .run(&execution_id, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.status, ExecutionStatus::Completed);
  assert_eq!(summary.credits_consumed, 0);
}

#[tokio::test]
async fn cancellation_between_phases_fails_the_run() {
  let h = harness();
  h.store.create_workflow(&workflow_record("wf-1")).await.unwrap();
  h.store.set_balance("user-1", 10).await.unwrap();

  let plan = plan(&[&[node("a", "SOURCE", &[])]]);
  let execution_id = h
    .engine
    .create_execution("wf-1", "user-1", "manual", &plan, &[])
    .await
    .unwrap();

  let cancel = CancellationToken::new();
  cancel.cancel();

  let summary = h.engine.run(&execution_id, cancel).await.unwrap();
  assert_eq!(summary.status, ExecutionStatus::Failed);
  assert_eq!(summary.credits_consumed, 0);

  // Nothing started; the phase stayed pending.
  let phases = h.store.list_phases(&execution_id).await.unwrap();
  assert_eq!(phases[0].status, PhaseStatus::Pending);
  assert!(phases[0].started_at.is_none());
}
