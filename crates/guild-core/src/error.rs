//! Error types for `guild-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid timestamp: {0:?}")]
  InvalidTimestamp(String),

  #[error("invalid url: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("malformed feed payload: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
