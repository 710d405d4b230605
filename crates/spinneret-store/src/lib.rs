//! Spinneret Store
//!
//! Storage trait and sqlite implementation for workflow executions, phases,
//! phase logs, the denormalized workflow last-run pointer, and user credit
//! balances.
//!
//! The [`Store`] trait is the full persisted-state contract the execution
//! engine relies on. Two operations deserve attention:
//! - [`Store::decrement_balance`] is the atomic "decrement if balance is
//!   sufficient" primitive used for credit metering; it must be a single
//!   conditional write, never a read-then-write.
//! - [`Store::update_last_run_status`] only touches the pointer while it
//!   still references the given execution, so a finalizing run can lose the
//!   race to a newer run without corrupting the pointer.

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use sqlx::types::Json;
pub use types::{
  ExecutionRecord, ExecutionStatus, LogEntry, LogLevel, PhaseRecord, PhaseStatus, WorkflowRecord,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for workflows, executions, phases, logs, and balances.
#[async_trait]
pub trait Store: Send + Sync {
  /// Create a workflow, replacing the definition if it already exists.
  async fn create_workflow(&self, workflow: &WorkflowRecord) -> Result<(), Error>;

  /// Get a workflow by ID.
  async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord, Error>;

  /// Point the workflow's last-run pointer at the given execution.
  async fn set_last_run(
    &self,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    at: DateTime<Utc>,
  ) -> Result<(), Error>;

  /// Update the last-run status, but only while the pointer still
  /// references `execution_id`. Returns whether a row changed.
  async fn update_last_run_status(
    &self,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    at: DateTime<Utc>,
  ) -> Result<bool, Error>;

  /// Create a new workflow execution.
  async fn create_execution(&self, execution: &ExecutionRecord) -> Result<(), Error>;

  /// Get a workflow execution by ID.
  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, Error>;

  /// Transition an execution to running and stamp its start time.
  async fn mark_execution_started(
    &self,
    execution_id: &str,
    at: DateTime<Utc>,
  ) -> Result<(), Error>;

  /// Write an execution's terminal status, total credits, and end time.
  async fn finalize_execution(
    &self,
    execution_id: &str,
    status: ExecutionStatus,
    credits_consumed: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Error>;

  /// Create a phase record.
  async fn create_phase(&self, phase: &PhaseRecord) -> Result<(), Error>;

  /// List an execution's phases in plan order.
  async fn list_phases(&self, execution_id: &str) -> Result<Vec<PhaseRecord>, Error>;

  /// Move every phase of an execution to pending.
  async fn mark_phases_pending(&self, execution_id: &str) -> Result<(), Error>;

  /// Transition a phase to running, persisting its resolved-input snapshot.
  async fn start_phase(
    &self,
    phase_id: &str,
    inputs: serde_json::Value,
    at: DateTime<Utc>,
  ) -> Result<(), Error>;

  /// Write a phase's terminal status, outputs, consumed credits, end time.
  async fn finalize_phase(
    &self,
    phase_id: &str,
    status: PhaseStatus,
    outputs: Option<serde_json::Value>,
    credits_consumed: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Error>;

  /// Append collected log lines to a phase.
  async fn append_logs(&self, phase_id: &str, logs: &[LogEntry]) -> Result<(), Error>;

  /// List a phase's log lines in insertion order.
  async fn list_logs(&self, phase_id: &str) -> Result<Vec<LogEntry>, Error>;

  /// Get a user's credit balance.
  async fn get_balance(&self, user_id: &str) -> Result<i64, Error>;

  /// Create or overwrite a user's credit balance.
  async fn set_balance(&self, user_id: &str, amount: i64) -> Result<(), Error>;

  /// Atomically decrement a balance; succeeds only when balance >= amount.
  async fn decrement_balance(&self, user_id: &str, amount: i64) -> Result<bool, Error>;
}
