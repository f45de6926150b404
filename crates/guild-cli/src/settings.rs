//! Runtime configuration, layered from a TOML file and `GUILD_*` variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use guild_core::present::DEFAULT_SITE_BASE;
use guild_sync::FeedConfig;
use serde::Deserialize;
use url::Url;

fn default_store_path() -> PathBuf {
  PathBuf::from("~/.local/share/guild-events/events.db")
}

fn default_prefs_path() -> PathBuf {
  PathBuf::from("~/.local/share/guild-events/prefs.toml")
}

fn default_site_base() -> String { DEFAULT_SITE_BASE.to_owned() }

/// Shape of `guild-events.toml`.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_prefs_path")]
  pub prefs_path: PathBuf,
  #[serde(default = "default_site_base")]
  pub site_base:  String,
  /// Absent until both feed URLs are configured.
  #[serde(default)]
  pub feed:       Option<FeedConfig>,
}

impl AppConfig {
  /// Read `path` (optional) and overlay `GUILD_`-prefixed environment
  /// variables; nested keys use `__`, e.g. `GUILD_FEED__EVENTS_URL`.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("GUILD")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;

    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.prefs_path = expand_tilde(&cfg.prefs_path);
    Ok(cfg)
  }

  /// Base for event URLs the feed gives as paths.
  pub fn site_base(&self) -> Result<Url> {
    Url::parse(&self.site_base)
      .with_context(|| format!("invalid site_base {:?}", self.site_base))
  }

  pub fn feed(&self) -> Result<&FeedConfig> {
    self.feed.as_ref().context(
      "feed is not configured: set [feed] organisations_url and events_url",
    )
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
