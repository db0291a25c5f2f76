//! Layered configuration for the `civic` binary.
//!
//! An optional TOML file is read first, then `CIVIC_`-prefixed environment
//! variables are laid over it. Nested tables use a double underscore, e.g.
//! `CIVIC_STORE__TIMEOUT_MS=2000` or `CIVIC_HOTSPOTS__MIN_ISSUES=5`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use civic_core::{HotspotOptions, StoreSettings};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub store:      StoreSettings,
  /// Defaults for `civic hotspots`; flags override them per run.
  pub hotspots:   HotspotOptions,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("civic.db"),
      store:      StoreSettings::default(),
      hotspots:   HotspotOptions::default(),
    }
  }
}

impl CliConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("CIVIC")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_toml(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("civic-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_yields_defaults() {
    let path = std::env::temp_dir().join(format!("absent-{}.toml", uuid::Uuid::new_v4()));
    let cfg = CliConfig::load(&path).unwrap();

    assert_eq!(cfg.store_path, PathBuf::from("civic.db"));
    assert_eq!(cfg.store.timeout_ms, 5_000);
    assert_eq!(cfg.hotspots.min_issues, 3);
    assert_eq!(cfg.hotspots.radius_meters, 500.0);
  }

  #[test]
  fn file_values_override_defaults_per_field() {
    let path = temp_toml(
      r#"
store_path = "/var/lib/civic/issues.db"

[store]
timeout_ms = 1500

[hotspots]
radius_meters = 250.0
category = "garbage"
"#,
    );

    let cfg = CliConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/civic/issues.db"));
    assert_eq!(cfg.store.timeout_ms, 1_500);
    assert_eq!(cfg.store.max_cas_attempts, 64);
    assert_eq!(cfg.hotspots.radius_meters, 250.0);
    assert_eq!(cfg.hotspots.min_issues, 3);
    assert_eq!(cfg.hotspots.category, Some(civic_core::IssueCategory::Garbage));
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/civic.db")),
      PathBuf::from(home).join("civic.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/civic.db")), PathBuf::from("/abs/civic.db"));
  }
}
