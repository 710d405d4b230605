//! Browser process lifecycle.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::process::Child;
use tracing::{debug, warn};

use crate::client::CdpClient;
use crate::error::BrowserError;
use crate::page::CdpPage;
use crate::{BrowserSession, PageHandle, chrome};

/// Launch configuration for the managed Chrome process.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
  /// Chrome remote-debugging port.
  pub debug_port: u16,
  /// Whether to run headless.
  pub headless: bool,
}

impl Default for LaunchConfig {
  fn default() -> Self {
    Self {
      debug_port: 9222,
      headless: true,
    }
  }
}

/// A Chrome process driven over CDP.
///
/// Owns the child process and the websocket client; closing kills the
/// process and removes the ephemeral profile directory.
pub struct CdpBrowser {
  client: CdpClient,
  child: Child,
  profile_dir: PathBuf,
  closed: bool,
}

impl CdpBrowser {
  /// Launch a fresh Chrome and connect to it.
  pub async fn launch(config: LaunchConfig) -> Result<Self, BrowserError> {
    let (child, ws_url, profile_dir) = chrome::launch(&config).await?;
    let client = CdpClient::connect(&ws_url).await?;

    Ok(Self {
      client,
      child,
      profile_dir,
      closed: false,
    })
  }
}

#[async_trait]
impl BrowserSession for CdpBrowser {
  async fn open_page(&self) -> Result<Arc<dyn PageHandle>, BrowserError> {
    let created = self
      .client
      .call("Target.createTarget", json!({ "url": "about:blank" }), None)
      .await?;
    let target_id = created["targetId"]
      .as_str()
      .ok_or_else(|| BrowserError::InvalidResponse("missing targetId".to_string()))?
      .to_string();

    let attached = self
      .client
      .call(
        "Target.attachToTarget",
        json!({ "targetId": target_id, "flatten": true }),
        None,
      )
      .await?;
    let session_id = attached["sessionId"]
      .as_str()
      .ok_or_else(|| BrowserError::InvalidResponse("missing sessionId".to_string()))?
      .to_string();

    debug!(%target_id, %session_id, "attached page session");

    let page = CdpPage::new(self.client.clone(), target_id, session_id);
    page.enable_domains().await?;

    Ok(Arc::new(page))
  }

  async fn close(&mut self) -> Result<(), BrowserError> {
    if self.closed {
      return Ok(());
    }
    self.closed = true;

    // Ask nicely first; the process gets killed regardless.
    if let Err(e) = self.client.call("Browser.close", Value::Null, None).await {
      debug!(error = %e, "Browser.close failed, killing process");
    }
    self.client.shutdown();

    if let Err(e) = self.child.kill().await {
      warn!(error = %e, "failed to kill chrome process");
    }

    if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
      warn!(error = %e, dir = %self.profile_dir.display(), "failed to remove profile dir");
    }

    Ok(())
  }
}
