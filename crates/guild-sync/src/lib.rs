//! Keeps the local event cache in step with the remote feed.
//!
//! [`Synchronizer`] compares the feed's last-modified timestamps with the
//! value remembered in [`Preferences`] and re-downloads only the documents
//! that changed. Feeds are reached through the [`FeedSource`] trait;
//! [`HttpFeed`] is the production implementation.

mod http;
mod prefs;
mod synchronizer;

pub mod error;
pub mod feed;

pub use error::{Error, FeedError, Result};
pub use feed::{FeedSource, Resource};
pub use http::{FeedConfig, HttpFeed};
pub use prefs::Preferences;
pub use synchronizer::{SyncOutcome, Synchronizer};

#[cfg(test)]
mod tests;
