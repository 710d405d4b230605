//! Page session over CDP.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::PageHandle;
use crate::client::CdpClient;
use crate::error::BrowserError;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A session attached to a single page target.
pub struct CdpPage {
  client: CdpClient,
  target_id: String,
  session_id: String,
}

impl CdpPage {
  pub(crate) fn new(client: CdpClient, target_id: String, session_id: String) -> Self {
    Self {
      client,
      target_id,
      session_id,
    }
  }

  pub fn target_id(&self) -> &str {
    &self.target_id
  }

  async fn call(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
    self
      .client
      .call(method, params, Some(&self.session_id))
      .await
  }

  pub(crate) async fn enable_domains(&self) -> Result<(), BrowserError> {
    self.call("Page.enable", Value::Null).await?;
    self.call("Runtime.enable", Value::Null).await?;
    Ok(())
  }

  /// Poll until the document has finished loading.
  async fn wait_for_load(&self) -> Result<(), BrowserError> {
    let start = Instant::now();
    loop {
      let state = self.evaluate("document.readyState").await?;
      if let Some(state) = state.as_str() {
        if state == "complete" || state == "interactive" {
          return Ok(());
        }
      }
      if start.elapsed() > LOAD_TIMEOUT {
        return Err(BrowserError::Timeout("page load".to_string()));
      }
      tokio::time::sleep(POLL_INTERVAL).await;
    }
  }
}

/// Quote a selector for embedding in a JavaScript expression.
fn js_string(value: &str) -> String {
  Value::String(value.to_string()).to_string()
}

#[async_trait]
impl PageHandle for CdpPage {
  async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
    let result = self.call("Page.navigate", json!({ "url": url })).await?;

    if let Some(error) = result.get("errorText").and_then(|v| v.as_str()) {
      if !error.is_empty() {
        return Err(BrowserError::NavigationFailed(error.to_string()));
      }
    }

    self.wait_for_load().await?;
    debug!(%url, "navigated");
    Ok(())
  }

  async fn html(&self) -> Result<String, BrowserError> {
    let result = self.evaluate("document.documentElement.outerHTML").await?;
    result
      .as_str()
      .map(|s| s.to_string())
      .ok_or_else(|| BrowserError::InvalidResponse("outerHTML is not a string".to_string()))
  }

  async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
    let result = self
      .call(
        "Runtime.evaluate",
        json!({
          "expression": expression,
          "returnByValue": true,
          "awaitPromise": true,
        }),
      )
      .await?;

    if let Some(exception) = result.get("exceptionDetails") {
      let text = exception
        .pointer("/exception/description")
        .or_else(|| exception.pointer("/text"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error");
      return Err(BrowserError::JavaScript(text.to_string()));
    }

    Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
  }

  async fn click(&self, selector: &str) -> Result<(), BrowserError> {
    let expression = format!(
      "(() => {{ const el = document.querySelector({sel}); if (!el) return false; el.click(); return true; }})()",
      sel = js_string(selector)
    );
    let found = self.evaluate(&expression).await?;
    if found.as_bool() != Some(true) {
      return Err(BrowserError::ElementNotFound(selector.to_string()));
    }
    Ok(())
  }

  async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
    let expression = format!(
      "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
       el.focus(); el.value = {val}; \
       el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
       el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
       return true; }})()",
      sel = js_string(selector),
      val = js_string(value)
    );
    let found = self.evaluate(&expression).await?;
    if found.as_bool() != Some(true) {
      return Err(BrowserError::ElementNotFound(selector.to_string()));
    }
    Ok(())
  }

  async fn wait_for_selector(
    &self,
    selector: &str,
    visible: bool,
    timeout: Duration,
  ) -> Result<(), BrowserError> {
    let expression = format!(
      "(() => {{ const el = document.querySelector({sel}); \
       if (!el) return 'missing'; \
       const style = window.getComputedStyle(el); \
       return (style.display === 'none' || style.visibility === 'hidden') ? 'hidden' : 'visible'; }})()",
      sel = js_string(selector)
    );

    let start = Instant::now();
    loop {
      let state = self.evaluate(&expression).await?;
      let state = state.as_str().unwrap_or("missing");
      let satisfied = if visible {
        state == "visible"
      } else {
        state != "visible"
      };
      if satisfied {
        return Ok(());
      }
      if start.elapsed() > timeout {
        return Err(BrowserError::Timeout(format!(
          "waiting for '{selector}' to become {}",
          if visible { "visible" } else { "hidden" }
        )));
      }
      tokio::time::sleep(POLL_INTERVAL).await;
    }
  }

  async fn scroll_to(&self, selector: &str) -> Result<(), BrowserError> {
    let expression = format!(
      "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
       el.scrollIntoView({{ block: 'center' }}); return true; }})()",
      sel = js_string(selector)
    );
    let found = self.evaluate(&expression).await?;
    if found.as_bool() != Some(true) {
      return Err(BrowserError::ElementNotFound(selector.to_string()));
    }
    Ok(())
  }

  async fn screenshot(&self) -> Result<String, BrowserError> {
    let result = self
      .call("Page.captureScreenshot", json!({ "format": "png" }))
      .await?;
    result["data"]
      .as_str()
      .map(|s| s.to_string())
      .ok_or_else(|| BrowserError::InvalidResponse("missing screenshot data".to_string()))
  }
}
