//! [`IssueRepository`] — owns issue records and keeps every index consistent.
//!
//! The store arbitrates every record change: a record is read with its
//! version and written back by compare-and-swap at that version, so two
//! repositories over one store (two `civic` processes, say) cannot overwrite
//! each other. The per-issue lock only saves same-process callers from
//! conflicting with one another.
//!
//! A status change appends the id to the new status index and removes it from
//! the old one before the record is swapped. After any record write, winning
//! or losing, the status indexes are synced to whatever record is current:
//! the id is placed in its status index and removed from the others, and the
//! sync repeats until the record version held still across those writes. If a
//! store call fails part way, the id stays reachable from some status index
//! and re-running the same update completes the move without duplicates.

use std::sync::Arc;

use chrono::Utc;
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  client::StoreClient,
  issue::{
    Issue, IssuePriority, IssueResponse, IssueStatus, IssueUpdate, NewIssue,
    Resolution, ResolveRequest,
  },
  keys::{self, IndexKey},
  locks::IssueLocks,
  settings::StoreSettings,
  store::KeyValueStore,
};

const RESPONSE_LEN: (usize, usize) = (10, 1000);
const RESOLUTION_NOTE_LEN: (usize, usize) = (10, 500);

pub struct IssueRepository<S> {
  client: StoreClient<S>,
  locks:  IssueLocks,
}

impl<S: KeyValueStore> IssueRepository<S> {
  pub fn new(store: Arc<S>, settings: StoreSettings) -> Self {
    Self { client: StoreClient::new(store, settings), locks: IssueLocks::default() }
  }

  // ── Issues ────────────────────────────────────────────────────────────────

  /// Record a new report and add it to all four index families.
  pub async fn create(&self, input: NewIssue) -> Result<Issue> {
    input.validate()?;

    tracing::info!(
      user_id = %input.user_id,
      category = %input.category,
      "issue.create.start"
    );

    let now = Utc::now();
    let issue = Issue {
      id:          Uuid::new_v4(),
      user_id:     input.user_id,
      title:       input.title,
      description: input.description,
      category:    input.category,
      priority:    IssuePriority::default(),
      status:      IssueStatus::Pending,
      latitude:    input.latitude,
      longitude:   input.longitude,
      address:     input.address,
      image_urls:  input.image_urls,
      assigned_to: None,
      created_at:  now,
      updated_at:  now,
      resolved_at: None,
      is_active:   true,
    };

    self.client.put(&keys::issue(issue.id), &issue).await?;

    for index in IndexKey::for_issue(&issue.user_id, issue.status, issue.category) {
      self.client.append_id(&index.to_string(), issue.id).await.inspect_err(|e| {
        tracing::error!(issue_id = %issue.id, %index, error = %e, "issue.create.index_failed");
      })?;
    }

    tracing::info!(
      issue_id = %issue.id,
      user_id = %issue.user_id,
      category = %issue.category,
      "issue.create.success"
    );
    Ok(issue)
  }

  /// Direct lookup. Soft-deleted issues are returned too.
  pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Issue>> {
    self.client.get(&keys::issue(id)).await
  }

  /// Merge `update` into the stored issue. Returns `None` if it does not exist.
  pub async fn update(&self, id: Uuid, update: IssueUpdate) -> Result<Option<Issue>> {
    self.update_where(id, &update, |_| true).await
  }

  /// Mark an issue inactive. Indexes are left as they are.
  pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
    let deleted = self
      .modify(id, |issue| {
        issue.is_active = false;
        issue.updated_at = Utc::now().max(issue.created_at);
        true
      })
      .await?;

    if deleted.is_none() {
      tracing::warn!(issue_id = %id, "issue.delete.not_found");
      return Ok(false);
    }
    tracing::info!(issue_id = %id, "issue.delete.success");
    Ok(true)
  }

  /// [`update`](Self::update), applied only if `accept` holds for the record
  /// as it stands when the write lands.
  async fn update_where<A>(
    &self,
    id: Uuid,
    update: &IssueUpdate,
    accept: A,
  ) -> Result<Option<Issue>>
  where
    A: Fn(&Issue) -> bool + Send + Sync,
  {
    let now = Utc::now();
    let changed = self
      .modify(id, |issue| {
        if !accept(issue) {
          return false;
        }
        issue.apply(update, now);
        true
      })
      .await?;

    let Some((issue, old_status)) = changed else {
      tracing::warn!(issue_id = %id, "issue.update.not_found");
      return Ok(None);
    };

    if issue.status != old_status {
      tracing::info!(
        issue_id = %id,
        old_status = %old_status,
        new_status = %issue.status,
        "issue.update.status_changed"
      );
    }
    tracing::info!(issue_id = %id, fields = ?update.field_names(), "issue.update.success");
    Ok(Some(issue))
  }

  /// Read-edit-swap loop on one issue record.
  ///
  /// `edit` returning `false` abandons the change. Yields the written record
  /// and the status it had before the edit, or `None` if the issue is missing
  /// or the edit was abandoned.
  async fn modify<F>(&self, id: Uuid, mut edit: F) -> Result<Option<(Issue, IssueStatus)>>
  where
    F: FnMut(&mut Issue) -> bool + Send,
  {
    let _guard = self.locks.lock(id).await;
    let key = keys::issue(id);

    for attempt in 1..=self.client.max_cas_attempts() {
      let Some(raw) = self.client.get_raw(&key).await? else {
        return Ok(None);
      };
      let mut issue: Issue = serde_json::from_value(raw.value)?;
      let old_status = issue.status;
      if !edit(&mut issue) {
        return Ok(None);
      }

      if issue.status != old_status {
        self.move_status(id, old_status, issue.status).await?;
      }

      let swapped = self.client.swap(&key, raw.version, &issue).await?;
      self.sync_status_indexes(id).await?;
      if swapped {
        return Ok(Some((issue, old_status)));
      }
      tracing::debug!(issue_id = %id, attempt, "issue.update.conflict");
    }
    Err(Error::Contention { key })
  }

  async fn move_status(&self, id: Uuid, from: IssueStatus, to: IssueStatus) -> Result<()> {
    self.client.append_id(&IndexKey::Status(to).to_string(), id).await?;
    self.client.remove_id(&IndexKey::Status(from).to_string(), id).await?;
    Ok(())
  }

  /// Bring the status indexes in line with the current record.
  ///
  /// Done once the record version is unchanged across a full pass, so a pass
  /// that raced a newer write is redone against that write.
  async fn sync_status_indexes(&self, id: Uuid) -> Result<()> {
    let key = keys::issue(id);

    for _ in 0..self.client.max_cas_attempts() {
      let Some(raw) = self.client.get_raw(&key).await? else {
        return Ok(());
      };
      let status = serde_json::from_value::<Issue>(raw.value)?.status;

      self.client.append_id(&IndexKey::Status(status).to_string(), id).await?;
      for other in IssueStatus::iter().filter(|s| *s != status) {
        self.client.remove_id(&IndexKey::Status(other).to_string(), id).await?;
      }

      let settled = self.client.get_raw(&key).await?.map(|r| r.version);
      if settled == Some(raw.version) {
        return Ok(());
      }
    }
    Err(Error::Contention { key })
  }

  // ── Responses ─────────────────────────────────────────────────────────────

  /// Attach an administrator's reply to an active issue.
  ///
  /// Returns `None` if the issue is missing or soft-deleted.
  pub async fn respond(
    &self,
    issue_id: Uuid,
    admin_id: &str,
    message: &str,
  ) -> Result<Option<IssueResponse>> {
    check_len("message", message, RESPONSE_LEN)?;

    let _guard = self.locks.lock(issue_id).await;
    if !self.is_active(issue_id).await? {
      tracing::warn!(issue_id = %issue_id, "issue.respond.not_found");
      return Ok(None);
    }

    let response = IssueResponse {
      id:         Uuid::new_v4(),
      issue_id,
      admin_id:   admin_id.to_owned(),
      message:    message.to_owned(),
      created_at: Utc::now(),
    };
    self.client.put(&keys::response(response.id), &response).await?;
    self.client.append_id(&keys::issue_responses(issue_id), response.id).await?;

    tracing::info!(
      issue_id = %issue_id,
      response_id = %response.id,
      admin_id,
      "issue.respond.success"
    );
    Ok(Some(response))
  }

  /// Responses for an active issue in the order they were added.
  pub async fn responses(&self, issue_id: Uuid) -> Result<Option<Vec<IssueResponse>>> {
    if !self.is_active(issue_id).await? {
      return Ok(None);
    }
    let ids = self.client.ids(&keys::issue_responses(issue_id)).await?;
    let found = futures::future::try_join_all(ids.iter().map(|id| async move {
      self.client.get::<IssueResponse>(&keys::response(*id)).await
    }))
    .await?;
    Ok(Some(found.into_iter().flatten().collect()))
  }

  // ── Resolution ────────────────────────────────────────────────────────────

  /// Close an active issue as resolved, recording who did it and why.
  ///
  /// The status change goes through the same record swap as
  /// [`update`](Self::update), and is abandoned if the issue was
  /// soft-deleted before it landed.
  pub async fn resolve(&self, issue_id: Uuid, request: ResolveRequest) -> Result<Option<Issue>> {
    if let Some(note) = &request.note {
      check_len("resolutionNote", note, RESOLUTION_NOTE_LEN)?;
    }
    let resolved_at = Utc::now();
    let update = IssueUpdate {
      status: Some(IssueStatus::Resolved),
      resolved_at: Some(resolved_at),
      ..IssueUpdate::default()
    };
    let Some(issue) = self.update_where(issue_id, &update, |issue| issue.is_active).await? else {
      tracing::warn!(issue_id = %issue_id, "issue.resolve.not_found");
      return Ok(None);
    };

    if request.note.is_some() || request.verification_image_url.is_some() {
      let resolution = Resolution {
        note: request.note,
        verification_image_url: request.verification_image_url,
        resolved_by: request.resolved_by.clone(),
        resolved_at,
      };
      self.client.put(&keys::issue_resolution(issue_id), &resolution).await?;
    }

    tracing::info!(issue_id = %issue_id, resolved_by = %request.resolved_by, "issue.resolve.success");
    Ok(Some(issue))
  }

  pub async fn resolution(&self, issue_id: Uuid) -> Result<Option<Resolution>> {
    self.client.get(&keys::issue_resolution(issue_id)).await
  }

  async fn is_active(&self, id: Uuid) -> Result<bool> {
    Ok(self.find_by_id(id).await?.is_some_and(|issue| issue.is_active))
  }

  #[cfg(test)]
  pub(crate) fn lock_table_len(&self) -> usize { self.locks.len() }
}

fn check_len(field: &'static str, value: &str, (min, max): (usize, usize)) -> Result<()> {
  let len = value.chars().count();
  if len < min || len > max {
    return Err(Error::Validation {
      field,
      reason: format!("length {len} is outside {min}..={max}"),
    });
  }
  Ok(())
}
