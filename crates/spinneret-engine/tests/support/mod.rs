//! Test doubles: an in-memory store, a mock browser, and scripted executors.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use spinneret_browser::{BrowserError, BrowserSession, PageHandle};
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};
use spinneret_store::{
  Error, ExecutionRecord, ExecutionStatus, Json, LogEntry, PhaseRecord, PhaseStatus, Store,
  WorkflowRecord,
};
use spinneret_workflow::{ExecutionPlan, Node, PlanPhase};

/// In-memory [`Store`] double.
#[derive(Default)]
pub struct MemoryStore {
  workflows: Mutex<HashMap<String, WorkflowRecord>>,
  executions: Mutex<HashMap<String, ExecutionRecord>>,
  phases: Mutex<Vec<PhaseRecord>>,
  logs: Mutex<HashMap<String, Vec<LogEntry>>>,
  balances: Mutex<HashMap<String, i64>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_workflow(&self, workflow: &WorkflowRecord) -> Result<(), Error> {
    self
      .workflows
      .lock()
      .insert(workflow.workflow_id.clone(), workflow.clone());
    Ok(())
  }

  async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord, Error> {
    self
      .workflows
      .lock()
      .get(workflow_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("workflow {workflow_id}")))
  }

  async fn set_last_run(
    &self,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    if let Some(workflow) = self.workflows.lock().get_mut(workflow_id) {
      workflow.last_run_id = Some(execution_id.to_string());
      workflow.last_run_status = Some(status);
      workflow.last_run_at = Some(at);
    }
    Ok(())
  }

  async fn update_last_run_status(
    &self,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    at: DateTime<Utc>,
  ) -> Result<bool, Error> {
    if let Some(workflow) = self.workflows.lock().get_mut(workflow_id) {
      if workflow.last_run_id.as_deref() == Some(execution_id) {
        workflow.last_run_status = Some(status);
        workflow.last_run_at = Some(at);
        return Ok(true);
      }
    }
    Ok(false)
  }

  async fn create_execution(&self, execution: &ExecutionRecord) -> Result<(), Error> {
    self
      .executions
      .lock()
      .insert(execution.execution_id.clone(), execution.clone());
    Ok(())
  }

  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, Error> {
    self
      .executions
      .lock()
      .get(execution_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("execution {execution_id}")))
  }

  async fn mark_execution_started(
    &self,
    execution_id: &str,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    if let Some(execution) = self.executions.lock().get_mut(execution_id) {
      execution.status = ExecutionStatus::Running;
      execution.started_at = Some(at);
    }
    Ok(())
  }

  async fn finalize_execution(
    &self,
    execution_id: &str,
    status: ExecutionStatus,
    credits_consumed: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    if let Some(execution) = self.executions.lock().get_mut(execution_id) {
      execution.status = status;
      execution.credits_consumed = credits_consumed;
      execution.completed_at = Some(at);
    }
    Ok(())
  }

  async fn create_phase(&self, phase: &PhaseRecord) -> Result<(), Error> {
    self.phases.lock().push(phase.clone());
    Ok(())
  }

  async fn list_phases(&self, execution_id: &str) -> Result<Vec<PhaseRecord>, Error> {
    let mut phases: Vec<PhaseRecord> = self
      .phases
      .lock()
      .iter()
      .filter(|p| p.execution_id == execution_id)
      .cloned()
      .collect();
    phases.sort_by_key(|p| p.number);
    Ok(phases)
  }

  async fn mark_phases_pending(&self, execution_id: &str) -> Result<(), Error> {
    for phase in self.phases.lock().iter_mut() {
      if phase.execution_id == execution_id {
        phase.status = PhaseStatus::Pending;
      }
    }
    Ok(())
  }

  async fn start_phase(
    &self,
    phase_id: &str,
    inputs: Value,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    for phase in self.phases.lock().iter_mut() {
      if phase.phase_id == phase_id {
        phase.status = PhaseStatus::Running;
        phase.inputs = Some(Json(inputs));
        phase.started_at = Some(at);
        return Ok(());
      }
    }
    Err(Error::NotFound(format!("phase {phase_id}")))
  }

  async fn finalize_phase(
    &self,
    phase_id: &str,
    status: PhaseStatus,
    outputs: Option<Value>,
    credits_consumed: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    for phase in self.phases.lock().iter_mut() {
      if phase.phase_id == phase_id {
        phase.status = status;
        phase.outputs = outputs.map(Json);
        phase.credits_consumed = credits_consumed;
        phase.completed_at = Some(at);
        return Ok(());
      }
    }
    Err(Error::NotFound(format!("phase {phase_id}")))
  }

  async fn append_logs(&self, phase_id: &str, logs: &[LogEntry]) -> Result<(), Error> {
    self
      .logs
      .lock()
      .entry(phase_id.to_string())
      .or_default()
      .extend(logs.iter().cloned());
    Ok(())
  }

  async fn list_logs(&self, phase_id: &str) -> Result<Vec<LogEntry>, Error> {
    Ok(self.logs.lock().get(phase_id).cloned().unwrap_or_default())
  }

  async fn get_balance(&self, user_id: &str) -> Result<i64, Error> {
    self
      .balances
      .lock()
      .get(user_id)
      .copied()
      .ok_or_else(|| Error::NotFound(format!("balance for user {user_id}")))
  }

  async fn set_balance(&self, user_id: &str, amount: i64) -> Result<(), Error> {
    self.balances.lock().insert(user_id.to_string(), amount);
    Ok(())
  }

  async fn decrement_balance(&self, user_id: &str, amount: i64) -> Result<bool, Error> {
    let mut balances = self.balances.lock();
    match balances.get_mut(user_id) {
      Some(balance) if *balance >= amount => {
        *balance -= amount;
        Ok(true)
      }
      _ => Ok(false),
    }
  }
}

/// Mock browser counting how often it is closed.
pub struct MockBrowser {
  closed: Arc<AtomicUsize>,
}

impl MockBrowser {
  pub fn new(closed: Arc<AtomicUsize>) -> Self {
    Self { closed }
  }
}

#[async_trait]
impl BrowserSession for MockBrowser {
  async fn open_page(&self) -> Result<Arc<dyn PageHandle>, BrowserError> {
    Err(BrowserError::SessionClosed)
  }

  async fn close(&mut self) -> Result<(), BrowserError> {
    self.closed.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

/// Emits a fixed value on one output.
pub struct EmitExecutor {
  pub output: String,
  pub value: Value,
}

#[async_trait]
impl TaskExecutor for EmitExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    ctx.set_output(&self.output, self.value.clone());
    Ok(())
  }
}

/// Copies the "Value" input to the "Value" output.
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let value = ctx
      .input("Value")
      .cloned()
      .ok_or_else(|| TaskError::MissingInput {
        name: "Value".to_string(),
      })?;
    ctx.set_output("Value", value);
    Ok(())
  }
}

/// Registers a mock browser on the environment.
pub struct AcquireExecutor {
  pub closed: Arc<AtomicUsize>,
}

#[async_trait]
impl TaskExecutor for AcquireExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    ctx.set_browser(Box::new(MockBrowser::new(self.closed.clone())));
    Ok(())
  }
}

/// Always fails.
pub struct FailExecutor;

#[async_trait]
impl TaskExecutor for FailExecutor {
  async fn run(&self, _ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    Err(TaskError::Failed("task exploded".to_string()))
  }
}

/// Succeeds without doing anything.
pub struct NoopExecutor;

#[async_trait]
impl TaskExecutor for NoopExecutor {
  async fn run(&self, _ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    Ok(())
  }
}

pub fn node(id: &str, task_type: &str, inputs: &[(&str, Value)]) -> Node {
  Node {
    id: id.to_string(),
    task_type: task_type.to_string(),
    inputs: inputs
      .iter()
      .map(|(k, v)| (k.to_string(), v.clone()))
      .collect(),
  }
}

/// Build a plan with one phase per slice, numbered from 1.
pub fn plan(phases: &[&[Node]]) -> ExecutionPlan {
  ExecutionPlan {
    phases: phases
      .iter()
      .enumerate()
      .map(|(i, nodes)| PlanPhase {
        number: i as u32 + 1,
        nodes: nodes.to_vec(),
      })
      .collect(),
  }
}

pub fn workflow_record(workflow_id: &str) -> WorkflowRecord {
  WorkflowRecord {
    workflow_id: workflow_id.to_string(),
    name: "Test".to_string(),
    definition: Json(serde_json::json!({})),
    last_run_id: None,
    last_run_status: None,
    last_run_at: None,
  }
}
