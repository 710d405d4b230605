/// Browser automation errors.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
  #[error("chrome executable not found")]
  ChromeNotFound,

  #[error("failed to launch chrome: {0}")]
  LaunchFailed(String),

  #[error("connection failed: {0}")]
  ConnectionFailed(String),

  #[error("navigation failed: {0}")]
  NavigationFailed(String),

  #[error("element not found: {0}")]
  ElementNotFound(String),

  #[error("javascript error: {0}")]
  JavaScript(String),

  #[error("protocol error {code}: {message}")]
  Protocol { code: i64, message: String },

  #[error("invalid response: {0}")]
  InvalidResponse(String),

  #[error("timed out: {0}")]
  Timeout(String),

  #[error("session closed")]
  SessionClosed,

  #[error(transparent)]
  Serde(#[from] serde_json::Error),
}
