//! Timing tasks.

use std::time::Duration;

use async_trait::async_trait;
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};

use crate::catalog::params;

/// Upper bound so a workflow cannot park its worker for hours.
const MAX_DELAY_MS: f64 = 300_000.0;

/// Pauses the run for a bounded number of milliseconds.
pub struct DelayExecutor;

#[async_trait]
impl TaskExecutor for DelayExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let ms = ctx
      .number_input(params::DURATION_MS)
      .ok_or_else(|| TaskError::MissingInput {
        name: params::DURATION_MS.to_string(),
      })?;

    if !(0.0..=MAX_DELAY_MS).contains(&ms) {
      return Err(TaskError::InvalidInput {
        name: params::DURATION_MS.to_string(),
        message: format!("expected 0..={MAX_DELAY_MS}ms, got {ms}"),
      });
    }

    tokio::time::sleep(Duration::from_millis(ms as u64)).await;
    ctx.log().info(format!("waited {ms}ms"));
    Ok(())
  }
}
