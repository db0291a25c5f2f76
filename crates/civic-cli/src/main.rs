//! `civic` — operator tool for the civic issue store.
//!
//! Reads `civic.toml` (or the path given with `--config`) plus `CIVIC_*`
//! environment variables, opens the SQLite store and runs one subcommand.
//! Results go to stdout as pretty JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! civic --user alice report --title "Pothole" --description "Deep hole" \
//!   --category pothole --lat 12.97 --lng 77.59
//! civic --user ops --role admin update <ID> --status in_progress
//! civic hotspots --radius 300 --min-issues 4
//! ```

mod commands;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use civic_core::{Identity, Role};
use civic_store_sqlite::SqliteStore;
use clap::Parser;
use commands::{App, Command};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::CliConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "civic", version, about = "Civic issue store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "civic.toml")]
  config: PathBuf,

  /// Caller id recorded as reporter, responder or resolver.
  #[arg(long, env = "CIVIC_USER", default_value = "operator")]
  user: String,

  /// Caller role.
  #[arg(long, env = "CIVIC_ROLE", default_value_t = Role::Complainant)]
  role: Role,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let app = App::new(Arc::new(store), &cfg, Identity::new(cli.user, cli.role));
  let output = app.run(cli.command).await?;

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() { Cli::command().debug_assert(); }

  #[test]
  fn negative_coordinates_parse() {
    let cli = Cli::try_parse_from([
      "civic", "--user", "alice", "report",
      "--title", "Leak", "--description", "Water on the street",
      "--category", "water_leak", "--lat", "-33.86", "--lng", "-151.2",
      "--image", "https://img/1", "--image", "https://img/2",
    ])
    .unwrap();

    let Command::Report { lat, lng, category, images, .. } = cli.command else {
      panic!("expected report");
    };
    assert_eq!(lat, -33.86);
    assert_eq!(lng, -151.2);
    assert_eq!(category, civic_core::IssueCategory::WaterLeak);
    assert_eq!(images.len(), 2);
  }

  #[test]
  fn role_and_filters_parse() {
    let cli = Cli::try_parse_from([
      "civic", "--role", "admin", "list", "--status", "in_progress", "--limit", "5",
    ])
    .unwrap();

    assert_eq!(cli.role, Role::Admin);
    let Command::List { status, limit, offset, .. } = cli.command else {
      panic!("expected list");
    };
    assert_eq!(status, Some(civic_core::IssueStatus::InProgress));
    assert_eq!(limit, 5);
    assert_eq!(offset, 0);
  }

  #[test]
  fn unknown_category_is_rejected() {
    let result = Cli::try_parse_from([
      "civic", "report", "--title", "t", "--description", "d",
      "--category", "volcano", "--lat", "0", "--lng", "0",
    ]);
    assert!(result.is_err());
  }
}
