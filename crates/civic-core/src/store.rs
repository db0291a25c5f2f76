//! The `KeyValueStore` trait — the storage port the core is written against.
//!
//! The trait is implemented by storage backends (e.g. `civic-store-sqlite`,
//! or [`MemoryStore`](crate::MemoryStore) for tests). The repository and
//! query service depend on this abstraction, not on any concrete backend.

use std::future::Future;

use serde_json::Value;

/// A stored value together with the version it was read at.
///
/// Versions start at 1 on first write and increase by one on every write to
/// the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
  pub value:   Value,
  pub version: u64,
}

/// Result of [`KeyValueStore::compare_and_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
  /// The write landed; carries the new version.
  Swapped(u64),
  /// The key was not at the expected version; nothing was written.
  Conflict,
}

/// Abstraction over a durable string-keyed JSON store.
///
/// Each method is atomic for its single key and read-your-writes consistent.
/// No cross-key transactions are offered; callers that must keep several
/// keys consistent build on [`compare_and_swap`](Self::compare_and_swap).
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read a key. Returns `None` if it has never been written.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Versioned>, Self::Error>> + Send + 'a;

  /// Unconditionally write a key and return its new version.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Write `value` only if the key is currently at `expected`.
  ///
  /// `expected = None` means the key must not exist yet.
  fn compare_and_swap<'a>(
    &'a self,
    key: &'a str,
    expected: Option<u64>,
    value: Value,
  ) -> impl Future<Output = Result<CasOutcome, Self::Error>> + Send + 'a;
}
