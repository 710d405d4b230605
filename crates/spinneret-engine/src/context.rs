use std::sync::Arc;

use spinneret_browser::{BrowserSession, PageHandle};
use spinneret_task::TaskDefinition;
use spinneret_workflow::Node;

use crate::environment::Environment;
use crate::logs::LogCollector;

/// Node-scoped view of the environment handed to a task executor.
///
/// This is everything a task may touch: its own wired inputs, its declared
/// outputs, the shared browser resource, the owning user, and the phase's
/// structured logger.
pub struct ExecutionContext<'a> {
  node: &'a Node,
  definition: &'a TaskDefinition,
  env: &'a mut Environment,
  logs: &'a LogCollector,
}

impl<'a> ExecutionContext<'a> {
  pub fn new(
    node: &'a Node,
    definition: &'a TaskDefinition,
    env: &'a mut Environment,
    logs: &'a LogCollector,
  ) -> Self {
    Self {
      node,
      definition,
      env,
      logs,
    }
  }

  pub fn node_id(&self) -> &str {
    &self.node.id
  }

  pub fn user_id(&self) -> &str {
    self.env.user_id()
  }

  /// Read a wired input value.
  pub fn input(&self, name: &str) -> Option<&serde_json::Value> {
    self.env.node_io(&self.node.id)?.inputs.get(name)
  }

  /// Read a wired input as a string slice.
  pub fn string_input(&self, name: &str) -> Option<&str> {
    self.input(name)?.as_str()
  }

  /// Read a wired input as a number, accepting numeric strings from the
  /// editor.
  pub fn number_input(&self, name: &str) -> Option<f64> {
    match self.input(name)? {
      serde_json::Value::Number(n) => n.as_f64(),
      serde_json::Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  /// Record an output. Undeclared outputs are rejected and logged; a task
  /// may only produce what its definition promises.
  pub fn set_output(&mut self, name: &str, value: serde_json::Value) {
    if self.definition.output(name).is_none() {
      self.logs.error(format!(
        "task '{}' tried to set undeclared output '{name}'",
        self.definition.task_type
      ));
      return;
    }
    self
      .env
      .node_io_mut(&self.node.id)
      .outputs
      .insert(name.to_string(), value);
  }

  pub fn has_browser(&self) -> bool {
    self.env.has_browser()
  }

  /// The shared browser, if a task has registered one.
  pub fn browser(&self) -> Option<&dyn BrowserSession> {
    self.env.browser()
  }

  /// Register the shared browser created by this task.
  pub fn set_browser(&mut self, browser: Box<dyn BrowserSession>) {
    self.env.set_browser(browser);
  }

  pub fn page(&self) -> Option<Arc<dyn PageHandle>> {
    self.env.page()
  }

  pub fn set_page(&mut self, page: Arc<dyn PageHandle>) {
    self.env.set_page(page);
  }

  /// The phase's structured logger.
  pub fn log(&self) -> &LogCollector {
    self.logs
  }
}
