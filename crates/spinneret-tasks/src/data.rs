//! JSON shaping tasks.

use async_trait::async_trait;
use serde_json::{Value, json};
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};

use crate::catalog::params;

fn missing(name: &str) -> TaskError {
  TaskError::MissingInput {
    name: name.to_string(),
  }
}

/// Parse a JSON input that arrives either as a serialized string (a literal
/// from the editor) or as an already-structured value (wired upstream).
fn parse_json_input(ctx: &ExecutionContext<'_>, name: &str) -> Result<Value, TaskError> {
  let raw = ctx.input(name).cloned().ok_or_else(|| missing(name))?;
  match raw {
    Value::String(s) => serde_json::from_str(&s).map_err(|e| TaskError::InvalidInput {
      name: name.to_string(),
      message: e.to_string(),
    }),
    other => Ok(other),
  }
}

/// Reads one property out of a JSON document.
pub struct ReadPropertyFromJsonExecutor;

#[async_trait]
impl TaskExecutor for ReadPropertyFromJsonExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let value = parse_json_input(ctx, params::JSON)?;
    let property = ctx
      .string_input(params::PROPERTY_NAME)
      .ok_or_else(|| missing(params::PROPERTY_NAME))?
      .to_string();

    let found = value
      .get(&property)
      .cloned()
      .ok_or_else(|| TaskError::Failed(format!("property '{property}' not found")))?;

    // String outputs stay plain; everything else is re-serialized.
    let output = match found {
      Value::String(s) => s,
      other => other.to_string(),
    };
    ctx.set_output(params::PROPERTY_VALUE, json!(output));
    Ok(())
  }
}

/// Adds (or overwrites) one property on a JSON document.
pub struct AddPropertyToJsonExecutor;

#[async_trait]
impl TaskExecutor for AddPropertyToJsonExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let value = parse_json_input(ctx, params::JSON)?;
    let property = ctx
      .string_input(params::PROPERTY_NAME)
      .ok_or_else(|| missing(params::PROPERTY_NAME))?
      .to_string();
    let new_value = ctx
      .string_input(params::VALUE)
      .ok_or_else(|| missing(params::VALUE))?
      .to_string();

    let Value::Object(mut object) = value else {
      return Err(TaskError::InvalidInput {
        name: params::JSON.to_string(),
        message: "expected a JSON object".to_string(),
      });
    };
    object.insert(property, json!(new_value));

    ctx.set_output(params::UPDATED_JSON, json!(Value::Object(object).to_string()));
    Ok(())
  }
}
