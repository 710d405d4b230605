//! Spinneret Tasks
//!
//! The builtin task catalog: definitions plus executors for browser
//! acquisition, page interaction, data extraction, JSON shaping, timing,
//! and webhook delivery. Everything here sits behind the engine's executor
//! contract; adding a task touches neither the compiler nor the engine.

mod browse;
mod catalog;
mod data;
mod deliver;
mod extract;
mod interact;
mod timing;

pub use browse::{
  LaunchBrowserExecutor, NavigateUrlExecutor, PageToHtmlExecutor, TakeScreenshotExecutor,
};
pub use catalog::{builtin_definitions, builtin_executors, params, task_types};
pub use data::{AddPropertyToJsonExecutor, ReadPropertyFromJsonExecutor};
pub use deliver::DeliverViaWebhookExecutor;
pub use extract::ExtractTextFromElementExecutor;
pub use interact::{
  ClickElementExecutor, FillInputExecutor, ScrollToElementExecutor, WaitForElementExecutor,
};
pub use timing::DelayExecutor;

#[cfg(test)]
pub(crate) mod test_util {
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  use async_trait::async_trait;
  use serde_json::Value;
  use spinneret_browser::{BrowserError, PageHandle};
  use spinneret_engine::{Environment, ExecutionContext, LogCollector};
  use spinneret_task::TaskDefinition;
  use spinneret_workflow::Node;

  use crate::builtin_definitions;

  /// A page double recording what was asked of it.
  #[derive(Default)]
  pub struct MockPage {
    pub calls: Mutex<Vec<String>>,
    pub html: String,
  }

  impl MockPage {
    pub fn with_html(html: &str) -> Self {
      Self {
        calls: Mutex::new(Vec::new()),
        html: html.to_string(),
      }
    }

    fn record(&self, call: String) {
      self.calls.lock().unwrap().push(call);
    }

    fn check_selector(&self, selector: &str) -> Result<(), BrowserError> {
      if selector == "#absent" {
        Err(BrowserError::ElementNotFound(selector.to_string()))
      } else {
        Ok(())
      }
    }
  }

  #[async_trait]
  impl PageHandle for MockPage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
      self.record(format!("navigate {url}"));
      Ok(())
    }

    async fn html(&self) -> Result<String, BrowserError> {
      self.record("html".to_string());
      Ok(self.html.clone())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, BrowserError> {
      Ok(Value::Null)
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
      self.check_selector(selector)?;
      self.record(format!("click {selector}"));
      Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
      self.check_selector(selector)?;
      self.record(format!("fill {selector}={value}"));
      Ok(())
    }

    async fn wait_for_selector(
      &self,
      selector: &str,
      visible: bool,
      _timeout: Duration,
    ) -> Result<(), BrowserError> {
      self.check_selector(selector)?;
      self.record(format!("wait {selector} visible={visible}"));
      Ok(())
    }

    async fn scroll_to(&self, selector: &str) -> Result<(), BrowserError> {
      self.check_selector(selector)?;
      self.record(format!("scroll {selector}"));
      Ok(())
    }

    async fn screenshot(&self) -> Result<String, BrowserError> {
      self.record("screenshot".to_string());
      Ok("c2NyZWVuc2hvdA==".to_string())
    }
  }

  /// Builds a node-scoped context around one builtin task type.
  pub struct Fixture {
    node: Node,
    definition: TaskDefinition,
    env: Environment,
    logs: LogCollector,
  }

  impl Fixture {
    pub fn new(task_type: &str) -> Self {
      let definition = builtin_definitions()
        .lookup(task_type)
        .expect("unknown builtin task type")
        .clone();
      Self {
        node: Node {
          id: "n1".to_string(),
          task_type: task_type.to_string(),
          inputs: HashMap::new(),
        },
        definition,
        env: Environment::new("user-1"),
        logs: LogCollector::new(),
      }
    }

    pub fn with_input(mut self, name: &str, value: Value) -> Self {
      self
        .env
        .node_io_mut("n1")
        .inputs
        .insert(name.to_string(), value);
      self
    }

    pub fn with_page(mut self, page: Arc<MockPage>) -> Self {
      self.env.set_page(page);
      self
    }

    pub fn ctx(&mut self) -> ExecutionContext<'_> {
      ExecutionContext::new(&self.node, &self.definition, &mut self.env, &self.logs)
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
      self.env.output("n1", name)
    }
  }
}
