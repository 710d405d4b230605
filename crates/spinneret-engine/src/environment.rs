use std::collections::HashMap;
use std::sync::Arc;

use spinneret_browser::{BrowserSession, PageHandle};

/// Input/output value maps for one node.
#[derive(Debug, Clone, Default)]
pub struct NodeIo {
  pub inputs: HashMap<String, serde_json::Value>,
  pub outputs: HashMap<String, serde_json::Value>,
}

/// Mutable, run-scoped context shared by every phase of one run.
///
/// Holds the per-node value maps, the single shared automation resource
/// (created lazily by whichever task acquires it), and the owning user.
/// Created once per run; the engine releases the resource and clears the
/// maps when the run settles, regardless of outcome.
pub struct Environment {
  user_id: String,
  nodes: HashMap<String, NodeIo>,
  browser: Option<Box<dyn BrowserSession>>,
  page: Option<Arc<dyn PageHandle>>,
}

impl Environment {
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id: user_id.into(),
      nodes: HashMap::new(),
      browser: None,
      page: None,
    }
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  pub fn node_io(&self, node_id: &str) -> Option<&NodeIo> {
    self.nodes.get(node_id)
  }

  pub fn node_io_mut(&mut self, node_id: &str) -> &mut NodeIo {
    self.nodes.entry(node_id.to_string()).or_default()
  }

  /// Read a recorded output of an already-executed node.
  pub fn output(&self, node_id: &str, name: &str) -> Option<&serde_json::Value> {
    self.nodes.get(node_id)?.outputs.get(name)
  }

  pub fn has_browser(&self) -> bool {
    self.browser.is_some()
  }

  pub fn browser(&self) -> Option<&dyn BrowserSession> {
    self.browser.as_deref()
  }

  pub fn set_browser(&mut self, browser: Box<dyn BrowserSession>) {
    self.browser = Some(browser);
  }

  pub fn take_browser(&mut self) -> Option<Box<dyn BrowserSession>> {
    self.browser.take()
  }

  pub fn page(&self) -> Option<Arc<dyn PageHandle>> {
    self.page.clone()
  }

  pub fn set_page(&mut self, page: Arc<dyn PageHandle>) {
    self.page = Some(page);
  }

  /// Drop the page handle. Pages belong to the browser process; releasing
  /// the handle before the browser closes keeps teardown ordered.
  pub fn clear_page(&mut self) {
    self.page = None;
  }

  /// Drop all per-node state.
  pub fn clear(&mut self) {
    self.nodes.clear();
  }
}
