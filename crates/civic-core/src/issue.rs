//! Issue types — the records citizens report and administrators act on.
//!
//! An issue is never hard-deleted. Soft deletion flips `is_active`; the record
//! and its index entries are retained and filtered out at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on `image_urls` for a single report.
pub const MAX_IMAGE_URLS: usize = 5;

// ─── Closed enums ────────────────────────────────────────────────────────────

/// What kind of civic problem was reported.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
  Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueCategory {
  Pothole,
  Garbage,
  Streetlight,
  WaterLeak,
  Drainage,
  RoadDamage,
  Other,
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
  Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssuePriority {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

/// Workflow status. Every issue sits in exactly one `issues:status:*` index
/// matching this value.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
  Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueStatus {
  #[default]
  Pending,
  InProgress,
  Resolved,
  Rejected,
}

// ─── Issue ───────────────────────────────────────────────────────────────────

/// A reported civic problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
  pub id:          Uuid,
  /// Owner: the reporting user's id as issued by the identity layer.
  pub user_id:     String,
  pub title:       String,
  pub description: String,
  pub category:    IssueCategory,
  pub priority:    IssuePriority,
  pub status:      IssueStatus,
  pub latitude:    f64,
  pub longitude:   f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address:     Option<String>,
  #[serde(default)]
  pub image_urls:  Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assigned_to: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolved_at: Option<DateTime<Utc>>,
  pub is_active:   bool,
}

impl Issue {
  /// Apply a partial update in place and bump `updated_at`.
  ///
  /// Moving to [`IssueStatus::Resolved`] without an explicit `resolved_at`
  /// stamps it with `now`.
  pub(crate) fn apply(&mut self, update: &IssueUpdate, now: DateTime<Utc>) {
    if let Some(status) = update.status {
      self.status = status;
    }
    if let Some(priority) = update.priority {
      self.priority = priority;
    }
    if let Some(assignee) = &update.assigned_to {
      self.assigned_to = Some(assignee.clone());
    }
    if let Some(at) = update.resolved_at {
      self.resolved_at = Some(at);
    }
    if self.status == IssueStatus::Resolved && self.resolved_at.is_none() {
      self.resolved_at = Some(now);
    }
    self.updated_at = now.max(self.created_at);
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for [`IssueRepository::create`](crate::IssueRepository::create).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
  pub user_id:     String,
  pub title:       String,
  pub description: String,
  pub category:    IssueCategory,
  pub latitude:    f64,
  pub longitude:   f64,
  #[serde(default)]
  pub address:     Option<String>,
  #[serde(default)]
  pub image_urls:  Vec<String>,
}

impl NewIssue {
  /// Build a report with no address and no images.
  pub fn new(
    user_id: impl Into<String>,
    title: impl Into<String>,
    description: impl Into<String>,
    category: IssueCategory,
    latitude: f64,
    longitude: f64,
  ) -> Self {
    Self {
      user_id: user_id.into(),
      title: title.into(),
      description: description.into(),
      category,
      latitude,
      longitude,
      address: None,
      image_urls: Vec::new(),
    }
  }

  /// Re-check the range invariants the boundary layer is expected to enforce.
  pub fn validate(&self) -> Result<()> {
    if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
      return Err(Error::validation(
        "latitude",
        format!("{} is outside [-90, 90]", self.latitude),
      ));
    }
    if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
      return Err(Error::validation(
        "longitude",
        format!("{} is outside [-180, 180]", self.longitude),
      ));
    }
    if self.image_urls.len() > MAX_IMAGE_URLS {
      return Err(Error::validation(
        "imageUrls",
        format!("{} entries, at most {MAX_IMAGE_URLS} allowed", self.image_urls.len()),
      ));
    }
    Ok(())
  }
}

/// Partial update accepted by [`IssueRepository::update`](crate::IssueRepository::update).
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdate {
  pub status:      Option<IssueStatus>,
  pub priority:    Option<IssuePriority>,
  pub assigned_to: Option<String>,
  pub resolved_at: Option<DateTime<Utc>>,
}

impl IssueUpdate {
  pub fn status(status: IssueStatus) -> Self {
    Self { status: Some(status), ..Self::default() }
  }

  /// Names of the supplied fields, for logging.
  pub fn field_names(&self) -> Vec<&'static str> {
    [
      self.status.map(|_| "status"),
      self.priority.map(|_| "priority"),
      self.assigned_to.as_ref().map(|_| "assignedTo"),
      self.resolved_at.map(|_| "resolvedAt"),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

// ─── Responses and resolution ────────────────────────────────────────────────

/// An administrator's reply attached to an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
  pub id:         Uuid,
  pub issue_id:   Uuid,
  pub admin_id:   String,
  pub message:    String,
  pub created_at: DateTime<Utc>,
}

/// Input for [`IssueRepository::resolve`](crate::IssueRepository::resolve).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
  pub resolved_by:            String,
  #[serde(default)]
  pub note:                   Option<String>,
  #[serde(default)]
  pub verification_image_url: Option<String>,
}

/// Closing note stored alongside a resolved issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note:                   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub verification_image_url: Option<String>,
  pub resolved_by:            String,
  pub resolved_at:            DateTime<Utc>,
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
  Complainant,
  Volunteer,
  Admin,
}

/// The caller as established by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:   String,
  pub role: Role,
}

impl Identity {
  pub fn new(id: impl Into<String>, role: Role) -> Self {
    Self { id: id.into(), role }
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Owners and administrators may mutate or delete an issue.
  pub fn can_manage(&self, issue: &Issue) -> bool {
    self.is_admin() || issue.user_id == self.id
  }
}
