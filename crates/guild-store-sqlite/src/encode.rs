//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with millisecond precision
//! and a `Z` suffix; anything finer is truncated on the way in. Every value
//! has the same width, so string comparison in SQL orders them
//! chronologically.

use chrono::{DateTime, SecondsFormat, Utc};
use guild_core::model::{Event, NewEvent};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every event `SELECT`, in [`RawEvent::from_row`]
/// order.
pub const EVENT_COLUMNS: &str = "id, organiser_id, organiser_name, name, \
                                 from_date, to_date, location, description, url";

/// Raw values read directly from an `event` row.
pub struct RawEvent {
  pub id:             i64,
  pub organiser_id:   i64,
  pub organiser_name: String,
  pub name:           String,
  pub from_date:      String,
  pub to_date:        Option<String>,
  pub location:       Option<String>,
  pub description:    Option<String>,
  pub url:            String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      organiser_id:   row.get(1)?,
      organiser_name: row.get(2)?,
      name:           row.get(3)?,
      from_date:      row.get(4)?,
      to_date:        row.get(5)?,
      location:       row.get(6)?,
      description:    row.get(7)?,
      url:            row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let event = NewEvent {
      url:            self.url,
      organiser_id:   self.organiser_id,
      organiser_name: self.organiser_name,
      name:           self.name,
      from_date:      decode_dt(&self.from_date)?,
      to_date:        self.to_date.as_deref().map(decode_dt).transpose()?,
      location:       self.location,
      description:    self.description,
    };
    Ok(event.into_event(self.id))
  }
}

/// An event ready to bind into the upsert statement.
pub struct EncodedEvent {
  pub url:            String,
  pub organiser_id:   i64,
  pub organiser_name: String,
  pub name:           String,
  pub from_date:      String,
  pub to_date:        Option<String>,
  pub location:       Option<String>,
  pub description:    Option<String>,
}

impl From<NewEvent> for EncodedEvent {
  fn from(event: NewEvent) -> Self {
    Self {
      url:            event.url,
      organiser_id:   event.organiser_id,
      organiser_name: event.organiser_name,
      name:           event.name,
      from_date:      encode_dt(event.from_date),
      to_date:        event.to_date.map(encode_dt),
      location:       event.location,
      description:    event.description,
    }
  }
}
