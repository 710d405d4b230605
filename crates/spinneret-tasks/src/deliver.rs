//! Result delivery tasks.

use async_trait::async_trait;
use serde_json::Value;
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};
use url::Url;

use crate::catalog::params;

/// Posts a JSON body to a caller-supplied webhook.
pub struct DeliverViaWebhookExecutor {
  client: reqwest::Client,
}

impl Default for DeliverViaWebhookExecutor {
  fn default() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

#[async_trait]
impl TaskExecutor for DeliverViaWebhookExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let target = ctx
      .string_input(params::TARGET_URL)
      .ok_or_else(|| TaskError::MissingInput {
        name: params::TARGET_URL.to_string(),
      })?
      .to_string();
    Url::parse(&target).map_err(|e| TaskError::InvalidInput {
      name: params::TARGET_URL.to_string(),
      message: e.to_string(),
    })?;

    let body_raw = ctx
      .string_input(params::BODY)
      .ok_or_else(|| TaskError::MissingInput {
        name: params::BODY.to_string(),
      })?;
    let body: Value = serde_json::from_str(body_raw).map_err(|e| TaskError::InvalidInput {
      name: params::BODY.to_string(),
      message: e.to_string(),
    })?;

    let response = self
      .client
      .post(&target)
      .json(&body)
      .send()
      .await
      .map_err(|e| TaskError::Failed(format!("webhook request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
      return Err(TaskError::Failed(format!("webhook returned {status}")));
    }

    ctx.log().info(format!("delivered to {target} ({status})"));
    Ok(())
  }
}
