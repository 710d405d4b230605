use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use spinneret_browser::BrowserError;

use crate::context::ExecutionContext;

/// Errors a task reports back to the engine.
///
/// The engine treats any error identically to a failed task: the phase is
/// marked failed and the message joins the phase's log. Executors must catch
/// everything internally and report through this type; nothing may panic
/// across the contract boundary.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
  #[error("missing required input '{name}'")]
  MissingInput { name: String },

  #[error("invalid input '{name}': {message}")]
  InvalidInput { name: String, message: String },

  #[error(transparent)]
  Browser(#[from] BrowserError),

  #[error("{0}")]
  Failed(String),
}

/// The polymorphic capability every task type implements.
///
/// Contract rules:
/// - read only declared inputs, set only declared outputs;
/// - a task that acquires the shared browser must register it on the view
///   so downstream tasks and the engine's cleanup can find it;
/// - report failure by returning an error, never by panicking.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError>;
}

/// Maps task-type identifiers to their executors.
///
/// The engine depends only on this seam; adding a task type touches neither
/// the compiler nor the engine.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
  executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an executor, replacing any previous one for the same type.
  pub fn register(&mut self, task_type: impl Into<String>, executor: Arc<dyn TaskExecutor>) {
    self.executors.insert(task_type.into(), executor);
  }

  pub fn lookup(&self, task_type: &str) -> Option<Arc<dyn TaskExecutor>> {
    self.executors.get(task_type).cloned()
  }

  pub fn len(&self) -> usize {
    self.executors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.executors.is_empty()
  }
}
