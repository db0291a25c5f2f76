//! Typed, time-bounded access to a [`KeyValueStore`].
//!
//! Every store call runs under the configured timeout. Reads are retried once
//! after a short backoff; writes never are. Index lists are only ever changed
//! through [`StoreClient::modify_ids`], a compare-and-swap loop on one key.

use std::{future::Future, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
  Error, Result,
  settings::StoreSettings,
  store::{CasOutcome, KeyValueStore, Versioned},
};

pub(crate) struct StoreClient<S> {
  store:    Arc<S>,
  settings: StoreSettings,
}

impl<S> Clone for StoreClient<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), settings: self.settings.clone() }
  }
}

impl<S: KeyValueStore> StoreClient<S> {
  pub fn new(store: Arc<S>, settings: StoreSettings) -> Self {
    Self { store, settings }
  }

  async fn call<T>(
    &self,
    key: &str,
    fut: impl Future<Output = Result<T, S::Error>>,
  ) -> Result<T> {
    match tokio::time::timeout(self.settings.timeout(), fut).await {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(e)) => Err(Error::Storage(Box::new(e))),
      Err(_) => Err(Error::Timeout { key: key.to_owned() }),
    }
  }

  pub async fn get_raw(&self, key: &str) -> Result<Option<Versioned>> {
    match self.call(key, self.store.get(key)).await {
      Ok(found) => Ok(found),
      Err(e) => {
        tracing::warn!(key, error = %e, "store.read.retry");
        tokio::time::sleep(self.settings.read_retry_backoff()).await;
        self.call(key, self.store.get(key)).await
      }
    }
  }

  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let Some(raw) = self.get_raw(key).await? else {
      return Ok(None);
    };
    Ok(Some(serde_json::from_value(raw.value)?))
  }

  pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    self.call(key, self.store.set(key, value)).await?;
    Ok(())
  }

  /// Write `value` only if `key` is still at `version`. Returns whether the
  /// write landed. Never retried.
  pub async fn swap<T: Serialize>(&self, key: &str, version: u64, value: &T) -> Result<bool> {
    let value = serde_json::to_value(value)?;
    let outcome = self.call(key, self.store.compare_and_swap(key, Some(version), value)).await?;
    Ok(matches!(outcome, CasOutcome::Swapped(_)))
  }

  pub fn max_cas_attempts(&self) -> u32 { self.settings.max_cas_attempts }

  /// The ids stored under an index key; an unwritten key is an empty index.
  pub async fn ids(&self, key: &str) -> Result<Vec<Uuid>> {
    Ok(self.get(key).await?.unwrap_or_default())
  }

  /// Re-read, edit and conditionally write the id list at `key` until the
  /// write lands against the version that was read.
  ///
  /// `edit` returns `false` when it left the list unchanged; no write is
  /// issued then. Returns whether a write happened.
  pub async fn modify_ids<F>(&self, key: &str, mut edit: F) -> Result<bool>
  where
    F: FnMut(&mut Vec<Uuid>) -> bool + Send,
  {
    for attempt in 1..=self.settings.max_cas_attempts {
      let (mut ids, version) = match self.get_raw(key).await? {
        Some(raw) => (serde_json::from_value::<Vec<Uuid>>(raw.value)?, Some(raw.version)),
        None => (Vec::new(), None),
      };

      if !edit(&mut ids) {
        return Ok(false);
      }

      let value = serde_json::to_value(&ids)?;
      match self.call(key, self.store.compare_and_swap(key, version, value)).await? {
        CasOutcome::Swapped(_) => return Ok(true),
        CasOutcome::Conflict => {
          tracing::debug!(key, attempt, "store.cas.conflict");
          tokio::task::yield_now().await;
        }
      }
    }
    Err(Error::Contention { key: key.to_owned() })
  }

  /// Append `id` unless it is already present.
  pub async fn append_id(&self, key: &str, id: Uuid) -> Result<bool> {
    self
      .modify_ids(key, |ids| {
        if ids.contains(&id) {
          return false;
        }
        ids.push(id);
        true
      })
      .await
  }

  /// Remove every occurrence of `id`.
  pub async fn remove_id(&self, key: &str, id: Uuid) -> Result<bool> {
    self
      .modify_ids(key, |ids| {
        let before = ids.len();
        ids.retain(|other| *other != id);
        ids.len() != before
      })
      .await
  }
}
