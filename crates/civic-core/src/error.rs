//! Error types for `civic-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field}: {reason}")]
  Validation { field: &'static str, reason: String },

  #[error("issue not found: {0}")]
  NotFound(Uuid),

  #[error("store error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store call timed out on key {key:?}")]
  Timeout { key: String },

  /// The compare-and-swap retry budget ran out on an index key.
  #[error("too much contention on key {key:?}")]
  Contention { key: String },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }

  /// Whether the error came from the backing store rather than the input.
  pub fn is_storage(&self) -> bool {
    matches!(self, Self::Storage(_) | Self::Timeout { .. } | Self::Contention { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
