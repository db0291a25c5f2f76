//! [`IssueQueryService`] — read-side views built from the indexes.
//!
//! Listings resolve an index to records, drop soft-deleted issues and sort
//! newest first. Statistics count raw index entries and therefore still
//! include soft-deleted issues.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{
  Result,
  client::StoreClient,
  hotspot::{Hotspot, HotspotDetector, HotspotOptions},
  issue::{Issue, IssueCategory, IssueStatus},
  keys::{self, IndexKey},
  settings::StoreSettings,
  store::KeyValueStore,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`IssueQueryService::list_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueFilters {
  pub status:   Option<IssueStatus>,
  pub category: Option<IssueCategory>,
  pub limit:    usize,
  pub offset:   usize,
}

impl Default for IssueFilters {
  fn default() -> Self {
    Self { status: None, category: None, limit: DEFAULT_PAGE_SIZE, offset: 0 }
  }
}

impl IssueFilters {
  /// The index to scan: status wins over category, which wins over `all`.
  fn index(&self) -> IndexKey {
    match (self.status, self.category) {
      (Some(status), _) => IndexKey::Status(status),
      (None, Some(category)) => IndexKey::Category(category),
      (None, None) => IndexKey::All,
    }
  }

  fn matches(&self, issue: &Issue) -> bool {
    self.status.is_none_or(|s| issue.status == s)
      && self.category.is_none_or(|c| issue.category == c)
  }
}

/// One page of a listing plus the number of matches across all pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePage {
  pub issues: Vec<Issue>,
  pub total:  usize,
  pub limit:  usize,
  pub offset: usize,
}

/// Raw index sizes. Soft-deleted issues are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
  pub total:       usize,
  pub pending:     usize,
  pub in_progress: usize,
  pub resolved:    usize,
  pub rejected:    usize,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct IssueQueryService<S> {
  client:   StoreClient<S>,
  detector: HotspotDetector,
}

impl<S: KeyValueStore> IssueQueryService<S> {
  pub fn new(store: Arc<S>, settings: StoreSettings) -> Self {
    Self { client: StoreClient::new(store, settings), detector: HotspotDetector::new() }
  }

  /// Active issues matching `filters`, newest first, sliced to one page.
  pub async fn list_all(&self, filters: &IssueFilters) -> Result<Vec<Issue>> {
    let matches = self.matching(filters).await?;
    Ok(paginate(matches, filters.offset, filters.limit))
  }

  /// Like [`list_all`](Self::list_all), but also reports how many issues
  /// matched before slicing.
  pub async fn list_page(&self, filters: &IssueFilters) -> Result<IssuePage> {
    let matches = self.matching(filters).await?;
    let total = matches.len();
    Ok(IssuePage {
      issues: paginate(matches, filters.offset, filters.limit),
      total,
      limit: filters.limit,
      offset: filters.offset,
    })
  }

  /// Every active issue reported by `user_id`, newest first.
  pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Issue>> {
    let mut issues = self.load_active(&IndexKey::User(user_id.to_owned())).await?;
    sort_newest_first(&mut issues);
    Ok(issues)
  }

  /// The whole active set, optionally for one category, in listing order.
  pub async fn list_active(&self, category: Option<IssueCategory>) -> Result<Vec<Issue>> {
    let filters = IssueFilters { category, ..IssueFilters::default() };
    self.matching(&filters).await
  }

  pub async fn stats(&self) -> Result<IssueStats> {
    let count = |index: IndexKey| async move {
      self.client.ids(&index.to_string()).await.map(|ids| ids.len())
    };
    Ok(IssueStats {
      total:       count(IndexKey::All).await?,
      pending:     count(IndexKey::Status(IssueStatus::Pending)).await?,
      in_progress: count(IndexKey::Status(IssueStatus::InProgress)).await?,
      resolved:    count(IndexKey::Status(IssueStatus::Resolved)).await?,
      rejected:    count(IndexKey::Status(IssueStatus::Rejected)).await?,
    })
  }

  /// Active issues per category. Every category is present, possibly at 0.
  pub async fn category_breakdown(&self) -> Result<BTreeMap<IssueCategory, usize>> {
    let mut counts: BTreeMap<IssueCategory, usize> =
      IssueCategory::iter().map(|c| (c, 0)).collect();
    for issue in self.load_active(&IndexKey::All).await? {
      *counts.entry(issue.category).or_default() += 1;
    }
    Ok(counts)
  }

  /// Cluster the current active set.
  pub async fn hotspots(&self, options: &HotspotOptions) -> Result<Vec<Hotspot>> {
    let issues = self.list_active(options.category).await?;
    let hotspots = self.detector.detect(&issues, options)?;
    tracing::info!(
      count = hotspots.len(),
      scanned = issues.len(),
      category = ?options.category,
      radius_meters = options.radius_meters,
      "issue.hotspots.success"
    );
    Ok(hotspots)
  }

  async fn matching(&self, filters: &IssueFilters) -> Result<Vec<Issue>> {
    let mut issues = self.load_active(&filters.index()).await?;
    issues.retain(|issue| filters.matches(issue));
    sort_newest_first(&mut issues);
    Ok(issues)
  }

  /// Resolve an index to its active records, in index order.
  async fn load_active(&self, index: &IndexKey) -> Result<Vec<Issue>> {
    let ids = self.client.ids(&index.to_string()).await?;
    let records = futures::future::try_join_all(ids.iter().map(|id| self.load(*id))).await?;
    Ok(records.into_iter().flatten().filter(|issue| issue.is_active).collect())
  }

  async fn load(&self, id: Uuid) -> Result<Option<Issue>> {
    self.client.get(&keys::issue(id)).await
  }
}

/// Stable, so equal timestamps keep index (insertion) order.
fn sort_newest_first(issues: &mut [Issue]) {
  issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn paginate(issues: Vec<Issue>, offset: usize, limit: usize) -> Vec<Issue> {
  issues.into_iter().skip(offset).take(limit).collect()
}
