//! Tunables for how the core talks to its backing store.

use std::time::Duration;

use serde::Deserialize;

/// Store-call behaviour, deserialised from the `[store]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
  /// Upper bound on a single store call.
  pub timeout_ms:            u64,
  /// Pause before the single retry of an idempotent read.
  pub read_retry_backoff_ms: u64,
  /// Compare-and-swap attempts per index mutation before giving up.
  pub max_cas_attempts:      u32,
}

impl Default for StoreSettings {
  fn default() -> Self {
    Self {
      timeout_ms:            5_000,
      read_retry_backoff_ms: 50,
      max_cas_attempts:      64,
    }
  }
}

impl StoreSettings {
  pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

  pub fn read_retry_backoff(&self) -> Duration {
    Duration::from_millis(self.read_retry_backoff_ms)
  }
}
