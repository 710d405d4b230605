//! Chrome discovery and launch.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::browser::LaunchConfig;
use crate::error::BrowserError;

/// Response of the `/json/version` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowserVersion {
  #[serde(default)]
  browser: String,
  web_socket_debugger_url: String,
}

/// Find a Chrome/Chromium executable.
///
/// The `SPINNERET_CHROME` environment variable overrides the search.
pub(crate) fn find_chrome() -> Option<PathBuf> {
  if let Ok(path) = std::env::var("SPINNERET_CHROME") {
    let p = PathBuf::from(path);
    if p.exists() {
      return Some(p);
    }
  }

  #[cfg(target_os = "macos")]
  let paths = [
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
  ];

  #[cfg(target_os = "linux")]
  let paths = [
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
  ];

  #[cfg(target_os = "windows")]
  let paths = [
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
  ];

  paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Launch Chrome with remote debugging on an ephemeral profile directory.
///
/// Returns the child process, the browser websocket URL, and the profile
/// directory (removed again when the browser closes).
pub(crate) async fn launch(config: &LaunchConfig) -> Result<(Child, String, PathBuf), BrowserError> {
  let chrome_path = find_chrome().ok_or(BrowserError::ChromeNotFound)?;

  let profile_dir =
    std::env::temp_dir().join(format!("spinneret-profile-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&profile_dir)
    .map_err(|e| BrowserError::LaunchFailed(format!("profile dir: {e}")))?;

  let mut cmd = Command::new(&chrome_path);
  cmd
    .arg(format!("--remote-debugging-port={}", config.debug_port))
    .arg(format!("--user-data-dir={}", profile_dir.display()))
    .arg("--no-first-run")
    .arg("--no-default-browser-check")
    .arg("--disable-background-networking")
    .arg("--disable-sync")
    .arg("--metrics-recording-only")
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .kill_on_drop(true);

  if config.headless {
    cmd.arg("--headless=new");
  }

  let mut child = cmd
    .spawn()
    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

  info!(pid = ?child.id(), path = %chrome_path.display(), "launched chrome");

  let endpoint = format!("http://127.0.0.1:{}/json/version", config.debug_port);
  match wait_for_endpoint(&endpoint).await {
    Ok(ws_url) => Ok((child, ws_url, profile_dir)),
    Err(e) => {
      let _ = child.kill().await;
      let _ = std::fs::remove_dir_all(&profile_dir);
      Err(e)
    }
  }
}

/// Poll the debugging endpoint until Chrome starts accepting connections.
async fn wait_for_endpoint(endpoint: &str) -> Result<String, BrowserError> {
  const MAX_ATTEMPTS: u32 = 50;

  for attempt in 0..MAX_ATTEMPTS {
    match reqwest::get(endpoint).await {
      Ok(response) => {
        let version: BrowserVersion = response
          .json()
          .await
          .map_err(|e| BrowserError::ConnectionFailed(format!("{endpoint}: {e}")))?;
        debug!(browser = %version.browser, "chrome is up");
        return Ok(version.web_socket_debugger_url);
      }
      Err(_) if attempt + 1 < MAX_ATTEMPTS => {
        tokio::time::sleep(Duration::from_millis(200)).await;
      }
      Err(e) => {
        return Err(BrowserError::LaunchFailed(format!(
          "chrome did not start listening on {endpoint}: {e}"
        )));
      }
    }
  }

  Err(BrowserError::LaunchFailed(format!(
    "chrome did not start listening on {endpoint}"
  )))
}
