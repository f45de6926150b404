//! Error types for `guild-sync`.

use thiserror::Error;

use crate::feed::Resource;

/// Why a feed document could not be used. Every variant ends the sync run
/// without an update; none of them is fatal to the application.
#[derive(Debug, Error)]
pub enum FeedError {
  #[error("{0} feed unreachable: {1}")]
  Unreachable(Resource, #[source] reqwest::Error),

  #[error("{resource} feed answered {status}")]
  Status {
    resource: Resource,
    status:   reqwest::StatusCode,
  },

  #[error("{0} feed has no Last-Modified header")]
  MissingLastModified(Resource),

  #[error("{0} feed has an unreadable Last-Modified header: {1:?}")]
  InvalidLastModified(Resource, String),

  #[error("{0} feed payload is malformed: {1}")]
  Malformed(Resource, #[source] guild_core::Error),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("a sync is already in progress")]
  AlreadyRunning,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("preferences i/o error: {0}")]
  PrefsIo(#[from] std::io::Error),

  #[error("preferences file is unreadable: {0}")]
  PrefsDecode(#[from] toml::de::Error),

  #[error("preferences could not be written: {0}")]
  PrefsEncode(#[from] toml::ser::Error),

  #[error("http client error: {0}")]
  Client(#[source] reqwest::Error),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
