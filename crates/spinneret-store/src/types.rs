use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Status of a workflow execution (run).
///
/// `Pending -> Running -> {Completed | Failed}`; the terminal states admit
/// no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Pending,
  Running,
  Completed,
  Failed,
}

impl ExecutionStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }
}

/// Status of a single execution phase.
///
/// `Created -> Pending -> Running -> {Completed | Failed}`; a phase never
/// re-enters `Running` after reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PhaseStatus {
  Created,
  Pending,
  Running,
  Completed,
  Failed,
}

impl PhaseStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }
}

/// Severity of a collected phase log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LogLevel {
  Info,
  Warn,
  Error,
}

/// A workflow row; mainly the denormalized last-run pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowRecord {
  pub workflow_id: String,
  pub name: String,
  pub definition: Json<serde_json::Value>,
  pub last_run_id: Option<String>,
  pub last_run_status: Option<ExecutionStatus>,
  pub last_run_at: Option<DateTime<Utc>>,
}

/// A workflow execution as stored in the database.
///
/// `definition` snapshots the compiled graph (currently the edge list) so a
/// run stays executable even if the workflow is edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExecutionRecord {
  pub execution_id: String,
  pub workflow_id: String,
  pub user_id: String,
  pub trigger: String,
  pub status: ExecutionStatus,
  pub definition: Json<serde_json::Value>,
  pub credits_consumed: i64,
  pub created_at: DateTime<Utc>,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// One planned node of an execution as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PhaseRecord {
  pub phase_id: String,
  pub execution_id: String,
  /// 1-based phase number from the execution plan.
  pub number: i64,
  /// Task-type identifier, denormalized for display.
  pub name: String,
  /// Node snapshot taken at plan time.
  pub node: Json<serde_json::Value>,
  pub status: PhaseStatus,
  pub inputs: Option<Json<serde_json::Value>>,
  pub outputs: Option<Json<serde_json::Value>>,
  pub credits_consumed: i64,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// A structured log line collected while a phase executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LogEntry {
  pub level: LogLevel,
  pub message: String,
  pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_statuses() {
    assert!(!ExecutionStatus::Pending.is_terminal());
    assert!(!ExecutionStatus::Running.is_terminal());
    assert!(ExecutionStatus::Completed.is_terminal());
    assert!(ExecutionStatus::Failed.is_terminal());

    assert!(!PhaseStatus::Created.is_terminal());
    assert!(!PhaseStatus::Running.is_terminal());
    assert!(PhaseStatus::Completed.is_terminal());
    assert!(PhaseStatus::Failed.is_terminal());
  }

  #[test]
  fn status_serializes_snake_case() {
    assert_eq!(
      serde_json::to_string(&ExecutionStatus::Running).unwrap(),
      "\"running\""
    );
    assert_eq!(
      serde_json::to_string(&PhaseStatus::Created).unwrap(),
      "\"created\""
    );
  }
}
