//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use civic_core::{
  HotspotOptions, IssueCategory, IssueFilters, IssueQueryService, IssueRepository,
  IssueStatus, IssueUpdate, NewIssue, StoreSettings,
  store::{CasOutcome, KeyValueStore},
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Raw key-value behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_key_returns_none() {
  let s = store().await;
  assert!(s.get("issue:nope").await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get_round_trips_json_and_bumps_version() {
  let s = store().await;

  let v1 = s.set("k", json!({ "a": 1 })).await.unwrap();
  assert_eq!(v1, 1);
  let v2 = s.set("k", json!(["x", "y"])).await.unwrap();
  assert_eq!(v2, 2);

  let got = s.get("k").await.unwrap().unwrap();
  assert_eq!(got.value, json!(["x", "y"]));
  assert_eq!(got.version, 2);
}

#[tokio::test]
async fn cas_on_absent_key_requires_none() {
  let s = store().await;

  let stale = s.compare_and_swap("k", Some(1), json!(1)).await.unwrap();
  assert_eq!(stale, CasOutcome::Conflict);
  assert!(s.get("k").await.unwrap().is_none());

  let created = s.compare_and_swap("k", None, json!(1)).await.unwrap();
  assert_eq!(created, CasOutcome::Swapped(1));

  let again = s.compare_and_swap("k", None, json!(2)).await.unwrap();
  assert_eq!(again, CasOutcome::Conflict);
}

#[tokio::test]
async fn cas_with_current_version_swaps_and_stale_version_conflicts() {
  let s = store().await;
  s.set("k", json!("first")).await.unwrap();

  let swapped = s.compare_and_swap("k", Some(1), json!("second")).await.unwrap();
  assert_eq!(swapped, CasOutcome::Swapped(2));

  let stale = s.compare_and_swap("k", Some(1), json!("third")).await.unwrap();
  assert_eq!(stale, CasOutcome::Conflict);

  let got = s.get("k").await.unwrap().unwrap();
  assert_eq!(got.value, json!("second"));
  assert_eq!(got.version, 2);
}

#[tokio::test]
async fn data_survives_reopen() {
  let path = std::env::temp_dir().join(format!("civic-{}.db", Uuid::new_v4()));

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.set("issues:all", json!([])).await.unwrap();
    s.set("issues:all", json!(["a"])).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let got = s.get("issues:all").await.unwrap().unwrap();
  assert_eq!(got.value, json!(["a"]));
  assert_eq!(got.version, 2);

  drop(s);
  let _ = std::fs::remove_file(&path);
}

// ─── Through the repository ──────────────────────────────────────────────────

fn pothole(user: &str, lat: f64, lng: f64) -> NewIssue {
  NewIssue::new(user, "Pothole", "Deep hole in the road", IssueCategory::Pothole, lat, lng)
}

#[tokio::test]
async fn repository_and_queries_work_over_sqlite() {
  let s = Arc::new(store().await);
  let repo = IssueRepository::new(s.clone(), StoreSettings::default());
  let query = IssueQueryService::new(s.clone(), StoreSettings::default());

  let a = repo.create(pothole("alice", 12.9716, 77.5946)).await.unwrap();
  let b = repo.create(pothole("alice", 12.9717, 77.5946)).await.unwrap();
  let c = repo.create(pothole("bob", 12.9718, 77.5946)).await.unwrap();

  repo
    .update(b.id, IssueUpdate::status(IssueStatus::InProgress))
    .await
    .unwrap()
    .unwrap();

  let stats = query.stats().await.unwrap();
  assert_eq!(stats.total, 3);
  assert_eq!(stats.pending, 2);
  assert_eq!(stats.in_progress, 1);

  let in_progress = query
    .list_all(&IssueFilters { status: Some(IssueStatus::InProgress), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(in_progress.iter().map(|i| i.id).collect::<Vec<_>>(), vec![b.id]);

  let mine = query.list_by_user("alice").await.unwrap();
  assert_eq!(mine.len(), 2);

  let hotspots = query.hotspots(&HotspotOptions::default()).await.unwrap();
  assert_eq!(hotspots.len(), 1);
  assert_eq!(hotspots[0].issue_count, 3);

  assert!(repo.soft_delete(c.id).await.unwrap());
  let listed = query.list_all(&IssueFilters::default()).await.unwrap();
  assert!(listed.iter().all(|i| i.id != c.id));
  assert!(listed.iter().any(|i| i.id == a.id));
}
