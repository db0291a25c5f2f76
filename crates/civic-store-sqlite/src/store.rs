//! [`SqliteStore`] — the SQLite implementation of [`KeyValueStore`].

use std::path::Path;

use civic_core::store::{CasOutcome, KeyValueStore, Versioned};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use serde_json::Value;

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A key-value store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn decode_version(key: &str, version: i64) -> Result<u64> {
  u64::try_from(version)
    .map_err(|_| Error::CorruptVersion { key: key.to_owned(), version })
}

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<Versioned>> {
    let key_owned = key.to_owned();

    let row: Option<(String, i64)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value, version FROM kv WHERE key = ?1",
              rusqlite::params![key_owned],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(json, version)| {
        Ok(Versioned {
          value:   serde_json::from_str(&json)?,
          version: decode_version(key, version)?,
        })
      })
      .transpose()
  }

  async fn set(&self, key: &str, value: Value) -> Result<u64> {
    let key_owned = key.to_owned();
    let json = value.to_string();

    let version: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO kv (key, value, version) VALUES (?1, ?2, 1)
           ON CONFLICT (key) DO UPDATE
             SET value = excluded.value, version = kv.version + 1
           RETURNING version",
          rusqlite::params![key_owned, json],
          |row| row.get(0),
        )?)
      })
      .await?;

    decode_version(key, version)
  }

  async fn compare_and_swap(
    &self,
    key: &str,
    expected: Option<u64>,
    value: Value,
  ) -> Result<CasOutcome> {
    // A version beyond i64 can never have been stored.
    let expected = match expected.map(i64::try_from).transpose() {
      Ok(v) => v,
      Err(_) => return Ok(CasOutcome::Conflict),
    };
    let key_owned = key.to_owned();
    let json = value.to_string();

    let written: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<i64> = tx
          .query_row(
            "SELECT version FROM kv WHERE key = ?1",
            rusqlite::params![key_owned],
            |row| row.get(0),
          )
          .optional()?;

        if current != expected {
          return Ok(None);
        }

        let next = match current {
          Some(v) => {
            tx.execute(
              "UPDATE kv SET value = ?2, version = ?3 WHERE key = ?1",
              rusqlite::params![key_owned, json, v + 1],
            )?;
            v + 1
          }
          None => {
            tx.execute(
              "INSERT INTO kv (key, value, version) VALUES (?1, ?2, 1)",
              rusqlite::params![key_owned, json],
            )?;
            1
          }
        };

        tx.commit()?;
        Ok(Some(next))
      })
      .await?;

    match written {
      Some(version) => Ok(CasOutcome::Swapped(decode_version(key, version)?)),
      None => Ok(CasOutcome::Conflict),
    }
  }
}
