//! Core types and services for the civic issue store.
//!
//! This crate is deliberately free of database and transport dependencies.
//! Storage is reached through the [`store::KeyValueStore`] port; backends
//! (e.g. `civic-store-sqlite`, or [`memory::MemoryStore`] in tests) implement
//! it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

mod client;
mod locks;

pub mod error;
pub mod geo;
pub mod hotspot;
pub mod issue;
pub mod keys;
pub mod memory;
pub mod query;
pub mod repository;
pub mod settings;
pub mod store;

pub use error::{Error, Result};
pub use hotspot::{Hotspot, HotspotDetector, HotspotOptions};
pub use issue::{
  Identity, Issue, IssueCategory, IssuePriority, IssueResponse, IssueStatus,
  IssueUpdate, NewIssue, Resolution, ResolveRequest, Role,
};
pub use memory::MemoryStore;
pub use query::{IssueFilters, IssuePage, IssueQueryService, IssueStats};
pub use repository::IssueRepository;
pub use settings::StoreSettings;
pub use store::KeyValueStore;
