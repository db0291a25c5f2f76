//! [`MemoryStore`] — an in-process [`KeyValueStore`] for tests and tooling.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{PoisonError, RwLock},
};

use serde_json::Value;

use crate::store::{CasOutcome, KeyValueStore, Versioned};

/// A `HashMap` behind a lock. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, Versioned>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Number of keys written so far.
  pub fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<Versioned>, Infallible> {
    let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: Value) -> Result<u64, Infallible> {
    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    let version = entries.get(key).map_or(1, |v| v.version + 1);
    entries.insert(key.to_owned(), Versioned { value, version });
    Ok(version)
  }

  async fn compare_and_swap(
    &self,
    key: &str,
    expected: Option<u64>,
    value: Value,
  ) -> Result<CasOutcome, Infallible> {
    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    let current = entries.get(key).map(|v| v.version);
    if current != expected {
      return Ok(CasOutcome::Conflict);
    }
    let version = current.map_or(1, |v| v + 1);
    entries.insert(key.to_owned(), Versioned { value, version });
    Ok(CasOutcome::Swapped(version))
  }
}
