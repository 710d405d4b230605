use std::time::Duration;

/// Bounded retry with exponential backoff.
///
/// Applied only at the one genuinely racy write in the engine (the
/// denormalized last-run pointer), not as a general policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_backoff: Duration::from_millis(50),
      max_backoff: Duration::from_secs(1),
    }
  }
}

impl RetryPolicy {
  /// Backoff before the retry after `attempt` (0-based) failures.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let base = self.initial_backoff.as_millis() as u64;
    let ms = base
      .saturating_mul(2u64.saturating_pow(attempt))
      .min(self.max_backoff.as_millis() as u64);
    Duration::from_millis(ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_doubles_until_capped() {
    let policy = RetryPolicy {
      max_attempts: 5,
      initial_backoff: Duration::from_millis(100),
      max_backoff: Duration::from_millis(350),
    };

    assert_eq!(policy.backoff(0), Duration::from_millis(100));
    assert_eq!(policy.backoff(1), Duration::from_millis(200));
    assert_eq!(policy.backoff(2), Duration::from_millis(350));
    assert_eq!(policy.backoff(10), Duration::from_millis(350));
  }
}
