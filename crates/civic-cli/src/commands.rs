//! Subcommands and their execution against a [`KeyValueStore`].

use std::sync::Arc;

use anyhow::{Context as _, bail};
use civic_core::{
  Error, HotspotOptions, Identity, Issue, IssueCategory, IssueFilters, IssuePriority,
  IssueQueryService, IssueRepository, IssueStatus, IssueUpdate, NewIssue, ResolveRequest,
  KeyValueStore,
};
use clap::Subcommand;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::settings::CliConfig;

// ─── Subcommands ──────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// File a new issue as the caller.
  Report {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    category:    IssueCategory,
    #[arg(long, allow_hyphen_values = true)]
    lat:         f64,
    #[arg(long, allow_hyphen_values = true)]
    lng:         f64,
    #[arg(long)]
    address:     Option<String>,
    /// Image URL; repeat for several (at most 5).
    #[arg(long = "image")]
    images:      Vec<String>,
  },

  /// Print an issue with its responses and resolution note.
  Show { id: Uuid },

  /// List active issues, newest first.
  List {
    #[arg(long)]
    status:   Option<IssueStatus>,
    #[arg(long)]
    category: Option<IssueCategory>,
    #[arg(long, default_value_t = civic_core::query::DEFAULT_PAGE_SIZE)]
    limit:    usize,
    #[arg(long, default_value_t = 0)]
    offset:   usize,
  },

  /// List the caller's own active issues.
  Mine,

  /// Change status, priority or assignee (admin only).
  Update {
    id:          Uuid,
    #[arg(long)]
    status:      Option<IssueStatus>,
    #[arg(long)]
    priority:    Option<IssuePriority>,
    #[arg(long)]
    assigned_to: Option<String>,
  },

  /// Soft-delete an issue (owner or admin).
  Delete { id: Uuid },

  /// Attach an administrator response.
  Respond {
    id:      Uuid,
    #[arg(long)]
    message: String,
  },

  /// Mark an issue resolved (admin only).
  Resolve {
    id:    Uuid,
    #[arg(long)]
    note:  Option<String>,
    #[arg(long)]
    image: Option<String>,
  },

  /// Index counts and the per-category breakdown.
  Stats,

  /// Detect clusters of nearby active issues.
  Hotspots {
    #[arg(long)]
    radius:     Option<f64>,
    #[arg(long)]
    min_issues: Option<usize>,
    #[arg(long)]
    category:   Option<IssueCategory>,
  },
}

// ─── Execution ────────────────────────────────────────────────────────────────

pub struct App<S> {
  repo:     IssueRepository<S>,
  query:    IssueQueryService<S>,
  caller:   Identity,
  hotspots: HotspotOptions,
}

impl<S: KeyValueStore> App<S> {
  pub fn new(store: Arc<S>, cfg: &CliConfig, caller: Identity) -> Self {
    Self {
      repo: IssueRepository::new(store.clone(), cfg.store.clone()),
      query: IssueQueryService::new(store, cfg.store.clone()),
      caller,
      hotspots: cfg.hotspots.clone(),
    }
  }

  /// Run one subcommand and return what should be printed.
  pub async fn run(&self, command: Command) -> anyhow::Result<Value> {
    match command {
      Command::Report { title, description, category, lat, lng, address, images } => {
        let mut input =
          NewIssue::new(self.caller.id.clone(), title, description, category, lat, lng);
        input.address = address;
        input.image_urls = images;
        let issue = self.repo.create(input).await.context("failed to report issue")?;
        Ok(serde_json::to_value(issue)?)
      }

      Command::Show { id } => {
        let issue = self.existing(id).await?;
        let responses = self.repo.responses(id).await?;
        let resolution = self.repo.resolution(id).await?;
        Ok(json!({
          "issue": issue,
          "responses": responses,
          "resolution": resolution,
        }))
      }

      Command::List { status, category, limit, offset } => {
        let filters = IssueFilters { status, category, limit, offset };
        Ok(serde_json::to_value(self.query.list_page(&filters).await?)?)
      }

      Command::Mine => {
        Ok(serde_json::to_value(self.query.list_by_user(&self.caller.id).await?)?)
      }

      Command::Update { id, status, priority, assigned_to } => {
        self.require_admin("update")?;
        let update = IssueUpdate { status, priority, assigned_to, resolved_at: None };
        let issue = self.repo.update(id, update).await?.ok_or(Error::NotFound(id))?;
        Ok(serde_json::to_value(issue)?)
      }

      Command::Delete { id } => {
        let issue = self.existing(id).await?;
        if !self.caller.can_manage(&issue) {
          bail!("{} may not delete issue {id}", self.caller.id);
        }
        let deleted = self.repo.soft_delete(id).await?;
        Ok(json!({ "id": id, "deleted": deleted }))
      }

      Command::Respond { id, message } => {
        self.require_admin("respond")?;
        let response = self
          .repo
          .respond(id, &self.caller.id, &message)
          .await?
          .ok_or(Error::NotFound(id))?;
        Ok(serde_json::to_value(response)?)
      }

      Command::Resolve { id, note, image } => {
        self.require_admin("resolve")?;
        let request = ResolveRequest {
          resolved_by: self.caller.id.clone(),
          note,
          verification_image_url: image,
        };
        let issue = self.repo.resolve(id, request).await?.ok_or(Error::NotFound(id))?;
        Ok(serde_json::to_value(issue)?)
      }

      Command::Stats => {
        let stats = self.query.stats().await?;
        let categories = self.query.category_breakdown().await?;
        Ok(json!({ "stats": stats, "categories": categories }))
      }

      Command::Hotspots { radius, min_issues, category } => {
        let options = HotspotOptions {
          radius_meters: radius.unwrap_or(self.hotspots.radius_meters),
          min_issues:    min_issues.unwrap_or(self.hotspots.min_issues),
          category:      category.or(self.hotspots.category),
        };
        Ok(serde_json::to_value(self.query.hotspots(&options).await?)?)
      }
    }
  }

  async fn existing(&self, id: Uuid) -> anyhow::Result<Issue> {
    Ok(self.repo.find_by_id(id).await?.ok_or(Error::NotFound(id))?)
  }

  fn require_admin(&self, action: &str) -> anyhow::Result<()> {
    if !self.caller.is_admin() {
      bail!("only administrators may {action} issues");
    }
    Ok(())
  }
}
