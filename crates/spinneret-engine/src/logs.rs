use chrono::Utc;
use parking_lot::Mutex;
use spinneret_store::{LogEntry, LogLevel};
use tracing::{error, info, warn};

/// Collects structured log lines for one phase.
///
/// Lines are persisted with the phase record when it settles; they are also
/// mirrored to the process-level tracing subscriber as they arrive.
#[derive(Debug, Default)]
pub struct LogCollector {
  entries: Mutex<Vec<LogEntry>>,
}

impl LogCollector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn info(&self, message: impl Into<String>) {
    self.push(LogLevel::Info, message.into());
  }

  pub fn warn(&self, message: impl Into<String>) {
    self.push(LogLevel::Warn, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.push(LogLevel::Error, message.into());
  }

  fn push(&self, level: LogLevel, message: String) {
    match level {
      LogLevel::Info => info!("{message}"),
      LogLevel::Warn => warn!("{message}"),
      LogLevel::Error => error!("{message}"),
    }
    self.entries.lock().push(LogEntry {
      level,
      message,
      logged_at: Utc::now(),
    });
  }

  /// Take every collected line, leaving the collector empty.
  pub fn drain(&self) -> Vec<LogEntry> {
    std::mem::take(&mut *self.entries.lock())
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}
