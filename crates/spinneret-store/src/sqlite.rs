use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::types::{
  ExecutionRecord, ExecutionStatus, LogEntry, PhaseRecord, PhaseStatus, WorkflowRecord,
};
use crate::{Error, Store};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a store from an existing connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (and create if missing) a database at the given sqlite URL.
  pub async fn connect(url: &str) -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str(url)
      .map_err(sqlx::Error::from)?
      .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(Self { pool })
  }

  /// Open a fresh in-memory database.
  ///
  /// The pool is limited to one connection; each sqlite `:memory:`
  /// connection is otherwise its own database.
  pub async fn open_in_memory() -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(sqlx::Error::from)?;
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await?;
    Ok(Self { pool })
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
  async fn create_workflow(&self, workflow: &WorkflowRecord) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO workflows (workflow_id, name, definition, last_run_id, last_run_status, last_run_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (workflow_id) DO UPDATE SET name = excluded.name, definition = excluded.definition
            "#,
    )
    .bind(&workflow.workflow_id)
    .bind(&workflow.name)
    .bind(&workflow.definition)
    .bind(&workflow.last_run_id)
    .bind(workflow.last_run_status)
    .bind(workflow.last_run_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord, Error> {
    sqlx::query_as(
      r#"
            SELECT workflow_id, name, definition, last_run_id, last_run_status, last_run_at
            FROM workflows
            WHERE workflow_id = ?
            "#,
    )
    .bind(workflow_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("workflow {workflow_id}")))
  }

  async fn set_last_run(
    &self,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE workflows
            SET last_run_id = ?, last_run_status = ?, last_run_at = ?
            WHERE workflow_id = ?
            "#,
    )
    .bind(execution_id)
    .bind(status)
    .bind(at)
    .bind(workflow_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn update_last_run_status(
    &self,
    workflow_id: &str,
    execution_id: &str,
    status: ExecutionStatus,
    at: DateTime<Utc>,
  ) -> Result<bool, Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflows
            SET last_run_status = ?, last_run_at = ?
            WHERE workflow_id = ? AND last_run_id = ?
            "#,
    )
    .bind(status)
    .bind(at)
    .bind(workflow_id)
    .bind(execution_id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }

  async fn create_execution(&self, execution: &ExecutionRecord) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO workflow_executions (execution_id, workflow_id, user_id, "trigger", status, definition, credits_consumed, created_at, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&execution.execution_id)
        .bind(&execution.workflow_id)
        .bind(&execution.user_id)
        .bind(&execution.trigger)
        .bind(execution.status)
        .bind(&execution.definition)
        .bind(execution.credits_consumed)
        .bind(execution.created_at)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, Error> {
    sqlx::query_as(
            r#"
            SELECT execution_id, workflow_id, user_id, "trigger", status, definition, credits_consumed, created_at, started_at, completed_at
            FROM workflow_executions
            WHERE execution_id = ?
            "#,
        )
        .bind(execution_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("execution {execution_id}")))
  }

  async fn mark_execution_started(
    &self,
    execution_id: &str,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE workflow_executions
            SET status = ?, started_at = ?
            WHERE execution_id = ?
            "#,
    )
    .bind(ExecutionStatus::Running)
    .bind(at)
    .bind(execution_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn finalize_execution(
    &self,
    execution_id: &str,
    status: ExecutionStatus,
    credits_consumed: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE workflow_executions
            SET status = ?, credits_consumed = ?, completed_at = ?
            WHERE execution_id = ?
            "#,
    )
    .bind(status)
    .bind(credits_consumed)
    .bind(at)
    .bind(execution_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn create_phase(&self, phase: &PhaseRecord) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO execution_phases (phase_id, execution_id, number, name, node, status, inputs, outputs, credits_consumed, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&phase.phase_id)
        .bind(&phase.execution_id)
        .bind(phase.number)
        .bind(&phase.name)
        .bind(&phase.node)
        .bind(phase.status)
        .bind(&phase.inputs)
        .bind(&phase.outputs)
        .bind(phase.credits_consumed)
        .bind(phase.started_at)
        .bind(phase.completed_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn list_phases(&self, execution_id: &str) -> Result<Vec<PhaseRecord>, Error> {
    sqlx::query_as(
            r#"
            SELECT phase_id, execution_id, number, name, node, status, inputs, outputs, credits_consumed, started_at, completed_at
            FROM execution_phases
            WHERE execution_id = ?
            ORDER BY number ASC, rowid ASC
            "#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)
  }

  async fn mark_phases_pending(&self, execution_id: &str) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE execution_phases
            SET status = ?
            WHERE execution_id = ?
            "#,
    )
    .bind(PhaseStatus::Pending)
    .bind(execution_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn start_phase(
    &self,
    phase_id: &str,
    inputs: serde_json::Value,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE execution_phases
            SET status = ?, inputs = ?, started_at = ?
            WHERE phase_id = ?
            "#,
    )
    .bind(PhaseStatus::Running)
    .bind(Json(inputs))
    .bind(at)
    .bind(phase_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn finalize_phase(
    &self,
    phase_id: &str,
    status: PhaseStatus,
    outputs: Option<serde_json::Value>,
    credits_consumed: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE execution_phases
            SET status = ?, outputs = ?, credits_consumed = ?, completed_at = ?
            WHERE phase_id = ?
            "#,
    )
    .bind(status)
    .bind(outputs.map(Json))
    .bind(credits_consumed)
    .bind(at)
    .bind(phase_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn append_logs(&self, phase_id: &str, logs: &[LogEntry]) -> Result<(), Error> {
    for log in logs {
      sqlx::query(
        r#"
                INSERT INTO phase_logs (phase_id, level, message, logged_at)
                VALUES (?, ?, ?, ?)
                "#,
      )
      .bind(phase_id)
      .bind(log.level)
      .bind(&log.message)
      .bind(log.logged_at)
      .execute(&self.pool)
      .await?;
    }

    Ok(())
  }

  async fn list_logs(&self, phase_id: &str) -> Result<Vec<LogEntry>, Error> {
    sqlx::query_as(
      r#"
            SELECT level, message, logged_at
            FROM phase_logs
            WHERE phase_id = ?
            ORDER BY log_id ASC
            "#,
    )
    .bind(phase_id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::from)
  }

  async fn get_balance(&self, user_id: &str) -> Result<i64, Error> {
    let row: Option<(i64,)> = sqlx::query_as(
      r#"
            SELECT balance FROM user_balances WHERE user_id = ?
            "#,
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(|(balance,)| balance)
      .ok_or_else(|| Error::NotFound(format!("balance for user {user_id}")))
  }

  async fn set_balance(&self, user_id: &str, amount: i64) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO user_balances (user_id, balance)
            VALUES (?, ?)
            ON CONFLICT (user_id) DO UPDATE SET balance = excluded.balance
            "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn decrement_balance(&self, user_id: &str, amount: i64) -> Result<bool, Error> {
    // A single guarded UPDATE keeps the check-and-decrement atomic.
    let result = sqlx::query(
      r#"
            UPDATE user_balances
            SET balance = balance - ?1
            WHERE user_id = ?2 AND balance >= ?1
            "#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }
}
