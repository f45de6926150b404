//! The remote feed, as the synchronizer sees it.

use std::{fmt, future::Future};

use chrono::{DateTime, Utc};

use crate::FeedError;

/// The two documents the feed publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
  Organisations,
  Events,
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Organisations => "organisations",
      Self::Events => "events",
    })
  }
}

/// A source of feed documents.
///
/// Checking the timestamp must be cheap; fetching the body is only done when
/// the timestamp shows the cached copy is stale.
pub trait FeedSource: Send + Sync {
  /// When `resource` last changed on the remote side.
  fn last_modified(
    &self,
    resource: Resource,
  ) -> impl Future<Output = Result<DateTime<Utc>, FeedError>> + Send + '_;

  /// The full JSON body of `resource`.
  fn fetch(
    &self,
    resource: Resource,
  ) -> impl Future<Output = Result<String, FeedError>> + Send + '_;
}
