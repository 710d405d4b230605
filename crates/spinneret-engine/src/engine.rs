//! Workflow execution engine.
//!
//! One run occupies one task end-to-end. Phases execute strictly in plan
//! order; nodes within a phase run sequentially so credit deduction stays
//! deterministic. A failed phase stops the run (later phases may read the
//! failed phase's outputs, so nothing after it may start), finalization
//! fires exactly once, and the shared browser resource is released on every
//! path.

use std::sync::Arc;

use chrono::Utc;
use spinneret_store::{
  ExecutionRecord, ExecutionStatus, Json, PhaseRecord, PhaseStatus, Store,
};
use spinneret_task::{ParamKind, TaskDefinition, TaskRegistry};
use spinneret_workflow::{Edge, ExecutionPlan, Node};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::context::ExecutionContext;
use crate::environment::Environment;
use crate::error::EngineError;
use crate::executor::ExecutorRegistry;
use crate::logs::LogCollector;
use crate::retry::RetryPolicy;

/// Terminal summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  pub status: ExecutionStatus,
  pub credits_consumed: i64,
}

/// Mutable bookkeeping threaded through a run.
#[derive(Debug, Default)]
struct RunState {
  failed: bool,
  credits_consumed: i64,
}

/// Drives compiled execution plans against the store and the executor
/// registry.
pub struct ExecutionEngine {
  store: Arc<dyn Store>,
  definitions: Arc<TaskRegistry>,
  executors: ExecutorRegistry,
  retry: RetryPolicy,
}

impl ExecutionEngine {
  pub fn new(
    store: Arc<dyn Store>,
    definitions: Arc<TaskRegistry>,
    executors: ExecutorRegistry,
  ) -> Self {
    Self {
      store,
      definitions,
      executors,
      retry: RetryPolicy::default(),
    }
  }

  /// Override the retry policy used for the last-run pointer write.
  pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Persist a compiled plan as a pending execution.
  ///
  /// Creates the execution record (with an edge snapshot so the run stays
  /// executable if the workflow is edited), one phase record per planned
  /// node, and points the workflow's last-run pointer at the new run.
  /// Returns the execution id.
  pub async fn create_execution(
    &self,
    workflow_id: &str,
    user_id: &str,
    trigger: &str,
    plan: &ExecutionPlan,
    edges: &[Edge],
  ) -> Result<String, EngineError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    let execution = ExecutionRecord {
      execution_id: execution_id.clone(),
      workflow_id: workflow_id.to_string(),
      user_id: user_id.to_string(),
      trigger: trigger.to_string(),
      status: ExecutionStatus::Pending,
      definition: Json(serde_json::json!({ "edges": edges })),
      credits_consumed: 0,
      created_at: now,
      started_at: None,
      completed_at: None,
    };
    self.store.create_execution(&execution).await?;

    for phase in &plan.phases {
      for node in &phase.nodes {
        let record = PhaseRecord {
          phase_id: uuid::Uuid::new_v4().to_string(),
          execution_id: execution_id.clone(),
          number: phase.number as i64,
          name: node.task_type.clone(),
          node: Json(serde_json::to_value(node)?),
          status: PhaseStatus::Created,
          inputs: None,
          outputs: None,
          credits_consumed: 0,
          started_at: None,
          completed_at: None,
        };
        self.store.create_phase(&record).await?;
      }
    }

    self
      .store
      .set_last_run(workflow_id, &execution_id, ExecutionStatus::Pending, now)
      .await?;

    info!(%execution_id, %workflow_id, phases = plan.node_count(), "execution created");
    Ok(execution_id)
  }

  /// Run a previously created execution to completion.
  ///
  /// The terminal status and logs land in the store; the returned summary
  /// is a convenience for in-process callers. The cancellation token is a
  /// cooperative flag checked between phases only.
  #[instrument(name = "execution_run", skip(self, cancel), fields(execution_id = %execution_id))]
  pub async fn run(
    &self,
    execution_id: &str,
    cancel: CancellationToken,
  ) -> Result<RunSummary, EngineError> {
    let execution = self.store.get_execution(execution_id).await?;
    let phases = self.store.list_phases(execution_id).await?;
    let edges: Vec<Edge> = execution
      .definition
      .0
      .get("edges")
      .cloned()
      .map(serde_json::from_value)
      .transpose()?
      .unwrap_or_default();

    let mut env = Environment::new(&execution.user_id);
    let mut state = RunState::default();

    let phases_result = self
      .run_phases(&execution, &phases, &edges, &mut env, &mut state, &cancel)
      .await;

    // Release the shared resource on every path, store failures included.
    self.release_environment(&mut env).await;

    let status = if state.failed || phases_result.is_err() {
      ExecutionStatus::Failed
    } else {
      ExecutionStatus::Completed
    };
    let finalize_result = self
      .finalize(&execution, status, state.credits_consumed)
      .await;

    phases_result?;
    finalize_result?;

    match status {
      ExecutionStatus::Completed => {
        info!(credits = state.credits_consumed, "execution completed")
      }
      _ => error!(credits = state.credits_consumed, "execution failed"),
    }

    Ok(RunSummary {
      status,
      credits_consumed: state.credits_consumed,
    })
  }

  async fn run_phases(
    &self,
    execution: &ExecutionRecord,
    phases: &[PhaseRecord],
    edges: &[Edge],
    env: &mut Environment,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<(), EngineError> {
    self
      .store
      .mark_execution_started(&execution.execution_id, Utc::now())
      .await?;
    self
      .store
      .mark_phases_pending(&execution.execution_id)
      .await?;
    info!(phase_count = phases.len(), "execution started");

    for phase in phases {
      // Cooperative stop, checked only between phases so mid-phase work is
      // never torn down under an executor.
      if cancel.is_cancelled() {
        warn!("execution cancelled between phases");
        state.failed = true;
        break;
      }

      let succeeded = self.run_phase(execution, phase, edges, env, state).await?;
      if !succeeded {
        // Fail fast: later phases may consume this phase's outputs.
        state.failed = true;
        break;
      }
    }

    Ok(())
  }

  #[instrument(
    name = "phase_execute",
    skip_all,
    fields(
      execution_id = %execution.execution_id,
      phase_id = %phase.phase_id,
      task = %phase.name,
    )
  )]
  async fn run_phase(
    &self,
    execution: &ExecutionRecord,
    phase: &PhaseRecord,
    edges: &[Edge],
    env: &mut Environment,
    state: &mut RunState,
  ) -> Result<bool, EngineError> {
    let logs = LogCollector::new();

    let node: Node =
      serde_json::from_value(phase.node.0.clone()).map_err(|e| EngineError::MalformedPhase {
        phase_id: phase.phase_id.clone(),
        message: e.to_string(),
      })?;

    let definition = self.definitions.lookup(&node.task_type);

    // Resolve inputs before the phase goes live so the persisted snapshot
    // reflects exactly what the task will see.
    if let Some(definition) = definition {
      wire_inputs(&node, definition, edges, env, &logs);
    }
    let inputs = env
      .node_io(&node.id)
      .map(|io| serde_json::to_value(&io.inputs))
      .transpose()?
      .unwrap_or_else(|| serde_json::json!({}));

    self
      .store
      .start_phase(&phase.phase_id, inputs, Utc::now())
      .await?;
    info!("phase started");

    let mut phase_credits = 0i64;
    let succeeded = match definition {
      None => {
        // A node the compiler could not resolve must never silently execute.
        logs.error(format!("unknown task type '{}'", node.task_type));
        false
      }
      Some(definition) => {
        if self
          .charge(execution, definition, &logs, &mut phase_credits, state)
          .await?
        {
          self.invoke(&node, definition, env, &logs).await
        } else {
          false
        }
      }
    };

    let outputs = env
      .node_io(&node.id)
      .map(|io| serde_json::to_value(&io.outputs))
      .transpose()?;

    let status = if succeeded {
      PhaseStatus::Completed
    } else {
      PhaseStatus::Failed
    };
    self
      .store
      .finalize_phase(&phase.phase_id, status, outputs, phase_credits, Utc::now())
      .await?;
    self
      .store
      .append_logs(&phase.phase_id, &logs.drain())
      .await?;

    if succeeded {
      info!(credits = phase_credits, "phase completed");
    } else {
      error!("phase failed");
    }

    Ok(succeeded)
  }

  /// Deduct the task's cost up front; no task runs without being paid for.
  /// Payment is kept even if the task later fails.
  async fn charge(
    &self,
    execution: &ExecutionRecord,
    definition: &TaskDefinition,
    logs: &LogCollector,
    phase_credits: &mut i64,
    state: &mut RunState,
  ) -> Result<bool, EngineError> {
    let cost = definition.credit_cost as i64;
    if cost == 0 {
      return Ok(true);
    }

    let paid = self
      .store
      .decrement_balance(&execution.user_id, cost)
      .await?;
    if !paid {
      logs.error("insufficient credits");
      return Ok(false);
    }

    *phase_credits = cost;
    state.credits_consumed += cost;
    debug!(cost, "credits deducted");
    Ok(true)
  }

  async fn invoke(
    &self,
    node: &Node,
    definition: &TaskDefinition,
    env: &mut Environment,
    logs: &LogCollector,
  ) -> bool {
    let Some(executor) = self.executors.lookup(&node.task_type) else {
      logs.error(format!(
        "no executor registered for task type '{}'",
        node.task_type
      ));
      return false;
    };

    let mut ctx = ExecutionContext::new(node, definition, env, logs);
    match executor.run(&mut ctx).await {
      Ok(()) => true,
      Err(e) => {
        logs.error(e.to_string());
        false
      }
    }
  }

  async fn finalize(
    &self,
    execution: &ExecutionRecord,
    status: ExecutionStatus,
    credits_consumed: i64,
  ) -> Result<(), EngineError> {
    let now = Utc::now();
    self
      .store
      .finalize_execution(&execution.execution_id, status, credits_consumed, now)
      .await?;
    self.propagate_last_run(execution, status, now).await
  }

  /// Propagate the terminal status to the workflow's denormalized last-run
  /// pointer.
  ///
  /// This write may race with a newer run taking the pointer over, so it is
  /// retried with bounded backoff; on exhaustion the pointer is re-read,
  /// and losing to a newer run is downgraded to a debug note rather than
  /// treated as a failure.
  async fn propagate_last_run(
    &self,
    execution: &ExecutionRecord,
    status: ExecutionStatus,
    at: chrono::DateTime<Utc>,
  ) -> Result<(), EngineError> {
    for attempt in 0..self.retry.max_attempts {
      match self
        .store
        .update_last_run_status(&execution.workflow_id, &execution.execution_id, status, at)
        .await
      {
        Ok(true) => return Ok(()),
        Ok(false) => {
          debug!(attempt, "last-run pointer not updated");
        }
        Err(e) => {
          warn!(attempt, error = %e, "last-run pointer update failed");
        }
      }
      if attempt + 1 < self.retry.max_attempts {
        tokio::time::sleep(self.retry.backoff(attempt)).await;
      }
    }

    match self.store.get_workflow(&execution.workflow_id).await {
      Ok(workflow) => {
        if workflow.last_run_id.as_deref() == Some(execution.execution_id.as_str()) {
          error!(
            workflow_id = %execution.workflow_id,
            "last-run pointer still owned by this run but could not be updated"
          );
          Err(EngineError::LastRunPointer {
            workflow_id: execution.workflow_id.clone(),
          })
        } else {
          debug!("a newer run owns the last-run pointer");
          Ok(())
        }
      }
      Err(spinneret_store::Error::NotFound(_)) => {
        warn!(workflow_id = %execution.workflow_id, "workflow gone before finalization");
        Ok(())
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Close any open page handles, then the browser itself, and drop the
  /// per-node maps. Runs exactly once per run on every path.
  async fn release_environment(&self, env: &mut Environment) {
    env.clear_page();
    if let Some(mut browser) = env.take_browser() {
      if let Err(e) = browser.close().await {
        warn!(error = %e, "failed to close browser cleanly");
      }
    }
    env.clear();
  }
}

/// Wire a node's declared inputs from literals and upstream outputs.
///
/// For each declared input, in order: a literal wins; otherwise the unique
/// edge targeting the input supplies the already-executed source node's
/// recorded output. A missing upstream output is logged and the input left
/// unset - the engine never guesses a default. Browser-instance inputs are
/// carried by the environment, not the value maps.
fn wire_inputs(
  node: &Node,
  definition: &TaskDefinition,
  edges: &[Edge],
  env: &mut Environment,
  logs: &LogCollector,
) {
  let mut resolved: Vec<(String, serde_json::Value)> = Vec::new();

  for input in &definition.inputs {
    if input.kind == ParamKind::BrowserInstance {
      continue;
    }

    if node.has_literal(&input.name) {
      if let Some(value) = node.inputs.get(&input.name) {
        resolved.push((input.name.clone(), value.clone()));
      }
      continue;
    }

    let Some(edge) = edges
      .iter()
      .find(|e| e.target == node.id && e.target_input == input.name)
    else {
      if input.required {
        logs.error(format!(
          "no value wired for required input '{}'",
          input.name
        ));
      }
      continue;
    };

    match env.output(&edge.source, &edge.source_output) {
      Some(value) => resolved.push((input.name.clone(), value.clone())),
      None => {
        logs.error(format!(
          "upstream output '{}' of node '{}' has no recorded value",
          edge.source_output, edge.source
        ));
      }
    }
  }

  let io = env.node_io_mut(&node.id);
  for (name, value) in resolved {
    io.inputs.insert(name, value);
  }
}
