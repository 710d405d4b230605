//! Spinneret Browser
//!
//! The shared browser-automation resource. One workflow run owns at most one
//! live browser; whichever task acquires it registers the handles on the
//! run's environment, downstream tasks reuse them, and the engine releases
//! everything exactly once when the run settles.
//!
//! The engine and the task executors only see the [`BrowserSession`] and
//! [`PageHandle`] traits. The concrete implementation drives Chrome over the
//! DevTools protocol: a headless process with remote debugging enabled, a
//! websocket command channel, and flat per-target sessions.

mod browser;
mod chrome;
mod client;
mod error;
mod page;

pub use browser::{CdpBrowser, LaunchConfig};
pub use error::BrowserError;
pub use page::CdpPage;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// A live browser owned by one workflow run.
#[async_trait]
pub trait BrowserSession: Send + Sync {
  /// Open a new page (tab) in this browser.
  async fn open_page(&self) -> Result<Arc<dyn PageHandle>, BrowserError>;

  /// Close the browser and release everything it holds.
  ///
  /// Must be safe to call more than once; only the first call does work.
  async fn close(&mut self) -> Result<(), BrowserError>;
}

/// A single page within the shared browser.
#[async_trait]
pub trait PageHandle: Send + Sync {
  /// Navigate and wait for the document to be ready.
  async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

  /// Full document markup.
  async fn html(&self) -> Result<String, BrowserError>;

  /// Evaluate a JavaScript expression, returning its value by value.
  async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError>;

  /// Click the first element matching the selector.
  async fn click(&self, selector: &str) -> Result<(), BrowserError>;

  /// Set the value of the first element matching the selector.
  async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

  /// Wait until the selector is visible (or gone, when `visible` is false).
  async fn wait_for_selector(
    &self,
    selector: &str,
    visible: bool,
    timeout: Duration,
  ) -> Result<(), BrowserError>;

  /// Scroll the first matching element into view.
  async fn scroll_to(&self, selector: &str) -> Result<(), BrowserError>;

  /// Capture a png screenshot, returned base64-encoded.
  async fn screenshot(&self) -> Result<String, BrowserError>;
}
