//! SQL schema for the civic SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per key. `version` starts at 1 and is bumped on every write; it is
-- what compare-and-swap checks against.
CREATE TABLE IF NOT EXISTS kv (
    key      TEXT PRIMARY KEY,
    value    TEXT NOT NULL,     -- JSON document
    version  INTEGER NOT NULL CHECK (version > 0)
);

PRAGMA user_version = 1;
";
