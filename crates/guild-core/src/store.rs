//! The `EventStore` trait: the typed query layer over the local cache.
//!
//! The trait is implemented by storage backends (e.g. `guild-store-sqlite`).
//! The repository and synchronizer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  live::LiveQuery,
  model::{Event, EventId, NewEvent, Organisation, OrganisationId},
};

/// Abstraction over a local event cache.
///
/// Writes are upserts: a record whose key already exists overwrites the
/// stored row (last write wins) and is never reported as a conflict.
/// Organisations are keyed by id, events by URL.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or overwrite organisations in one transaction. Returns the number
  /// of rows written.
  fn upsert_organisations(
    &self,
    organisations: Vec<Organisation>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert or overwrite events in one transaction, keyed by URL. An event
  /// keeps its id across overwrites.
  ///
  /// Events whose organiser is not in the store are skipped. Returns the
  /// number of rows written.
  fn upsert_events(
    &self,
    events: Vec<NewEvent>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All organisations. Callers must not rely on the order.
  fn organisations(
    &self,
  ) -> impl Future<Output = Result<Vec<Organisation>, Self::Error>> + Send + '_;

  /// Events starting strictly after `now`, earliest first, optionally
  /// restricted to one organiser.
  fn events_after(
    &self,
    now: DateTime<Utc>,
    organiser: Option<OrganisationId>,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// A single event. Returns `None` if not found.
  fn event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  // ── Live reads ────────────────────────────────────────────────────────

  /// [`Self::organisations`], re-published after every relevant commit.
  fn watch_organisations(
    &self,
  ) -> impl Future<Output = Result<LiveQuery<Vec<Organisation>>, Self::Error>>
  + Send
  + '_;

  /// [`Self::events_after`] evaluated against the wall clock. Re-published
  /// after every relevant commit and whenever the earliest listed event
  /// starts.
  fn watch_events_from_now(
    &self,
    organiser: Option<OrganisationId>,
  ) -> impl Future<Output = Result<LiveQuery<Vec<Event>>, Self::Error>> + Send + '_;

  /// [`Self::event`], re-published after every relevant commit.
  fn watch_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<LiveQuery<Option<Event>>, Self::Error>>
  + Send
  + '_;
}
