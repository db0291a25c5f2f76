//! Error type for `civic-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored version does not fit the `u64` the port exposes.
  #[error("corrupt version {version} for key {key:?}")]
  CorruptVersion { key: String, version: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
