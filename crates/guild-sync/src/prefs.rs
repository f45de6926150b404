//! [`Preferences`]: small key-value state kept next to the cache.
//!
//! Holds the feed timestamp the cache was last brought up to. Stored as
//! TOML so it can be inspected and reset by hand.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct PrefsFile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Preferences {
  path:  PathBuf,
  state: PrefsFile,
}

impl Preferences {
  /// Load preferences from `path`. A missing file is a fresh install.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let state = match std::fs::read_to_string(&path) {
      Ok(raw) => toml::from_str(&raw)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => PrefsFile::default(),
      Err(e) => return Err(e.into()),
    };
    Ok(Self { path, state })
  }

  pub fn path(&self) -> &Path { &self.path }

  /// The feed timestamp the cache reflects; the Unix epoch if it has never
  /// been synced.
  pub fn last_updated(&self) -> DateTime<Utc> {
    self.state.last_updated.unwrap_or(DateTime::UNIX_EPOCH)
  }

  /// Remember `at` unless it is older than the stored value. Returns whether
  /// the stored value moved.
  pub fn record_last_updated(&mut self, at: DateTime<Utc>) -> bool {
    if self.state.last_updated.is_some_and(|current| current >= at) {
      return false;
    }
    self.state.last_updated = Some(at);
    true
  }

  /// Write to disk, replacing the previous file in one rename.
  pub fn save(&self) -> Result<()> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string(&self.state)?;
    let tmp = self.path.with_extension("toml.tmp");
    let written = std::fs::write(&tmp, content)
      .and_then(|()| std::fs::rename(&tmp, &self.path));
    if written.is_err() {
      let _ = std::fs::remove_file(&tmp);
    }
    Ok(written?)
  }
}
