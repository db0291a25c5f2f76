//! Per-issue async locks.
//!
//! Serialises the read → write → index-move sequence for one issue id while
//! leaving unrelated issues free to proceed. Table entries are dropped once
//! nobody holds or waits on them.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub(crate) struct IssueLocks {
  table: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

pub(crate) struct IssueGuard<'a> {
  locks: &'a IssueLocks,
  id:    Uuid,
  guard: Option<OwnedMutexGuard<()>>,
}

impl IssueLocks {
  pub async fn lock(&self, id: Uuid) -> IssueGuard<'_> {
    let entry = {
      let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
      Arc::clone(table.entry(id).or_default())
    };
    let guard = entry.lock_owned().await;
    IssueGuard { locks: self, id, guard: Some(guard) }
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

impl Drop for IssueGuard<'_> {
  fn drop(&mut self) {
    // Release the issue lock before inspecting the table so the only
    // remaining reference is the table's own.
    drop(self.guard.take());
    let mut table = self.locks.table.lock().unwrap_or_else(PoisonError::into_inner);
    if table.get(&self.id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
      table.remove(&self.id);
    }
  }
}
