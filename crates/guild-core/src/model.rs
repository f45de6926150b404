//! Organisations and the events they host.
//!
//! Both kinds of row are written only by the synchronizer and read by
//! everything else. An event always belongs to an organisation that exists in
//! the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feed-assigned organisation identifier. Stable across syncs.
pub type OrganisationId = i64;

/// Locally generated event identifier. Stable for a given event URL.
pub type EventId = i64;

// ─── Organisation ────────────────────────────────────────────────────────────

/// A society or group that organises events.
///
/// The wire shape in the feed is exactly `{ "id": .., "name": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
  pub id:   OrganisationId,
  pub name: String,
}

impl Organisation {
  pub fn new(id: OrganisationId, name: impl Into<String>) -> Self {
    Self { id, name: name.into() }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// An event as stored, with its local identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:             EventId,
  pub organiser_id:   OrganisationId,
  /// Copy of the organiser's display name as the feed supplied it.
  pub organiser_name: String,
  pub name:           String,
  pub from_date:      DateTime<Utc>,
  pub to_date:        Option<DateTime<Utc>>,
  pub location:       Option<String>,
  pub description:    Option<String>,
  /// Canonical page for the event. Unique across all events.
  pub url:            String,
}

// ─── NewEvent ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::EventStore::upsert_events`].
/// The `id` is assigned by the store and kept for as long as `url` matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
  pub url:            String,
  pub organiser_id:   OrganisationId,
  pub organiser_name: String,
  pub name:           String,
  pub from_date:      DateTime<Utc>,
  pub to_date:        Option<DateTime<Utc>>,
  pub location:       Option<String>,
  pub description:    Option<String>,
}

impl NewEvent {
  /// Convenience constructor with all optional fields left empty.
  pub fn new(
    url: impl Into<String>,
    organiser: &Organisation,
    name: impl Into<String>,
    from_date: DateTime<Utc>,
  ) -> Self {
    Self {
      url: url.into(),
      organiser_id: organiser.id,
      organiser_name: organiser.name.clone(),
      name: name.into(),
      from_date,
      to_date: None,
      location: None,
      description: None,
    }
  }

  /// Attach the store-assigned identifier.
  pub fn into_event(self, id: EventId) -> Event {
    Event {
      id,
      organiser_id: self.organiser_id,
      organiser_name: self.organiser_name,
      name: self.name,
      from_date: self.from_date,
      to_date: self.to_date,
      location: self.location,
      description: self.description,
      url: self.url,
    }
  }
}
