//! Record shapes of the remote JSON feed.
//!
//! The feed publishes two documents, each a JSON array: one of organisations
//! and one of events. Organisations deserialise straight into
//! [`Organisation`]; events go through [`EventRecord`] because the feed
//! spells its fields in camelCase and its dates as strings.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
  model::{NewEvent, Organisation, OrganisationId},
  timestamp, Result,
};

/// One element of the events document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
  /// Some revisions of the feed number their events. Identity is the URL, so
  /// this is read and then dropped.
  #[serde(default)]
  pub id:             Option<i64>,
  pub url:            String,
  pub organiser_id:   OrganisationId,
  pub organiser_name: String,
  pub name:           String,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub from_date:      DateTime<Utc>,
  #[serde(default, deserialize_with = "timestamp::deserialize_option")]
  pub to_date:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub location:       Option<String>,
  #[serde(default)]
  pub description:    Option<String>,
}

impl From<EventRecord> for NewEvent {
  fn from(record: EventRecord) -> Self {
    Self {
      url:            record.url,
      organiser_id:   record.organiser_id,
      organiser_name: record.organiser_name,
      name:           record.name,
      from_date:      record.from_date,
      to_date:        record.to_date,
      location:       record.location,
      description:    record.description,
    }
  }
}

/// Parse the organisations document.
pub fn parse_organisations(body: &str) -> Result<Vec<Organisation>> {
  Ok(serde_json::from_str(body)?)
}

/// Parse the events document. A single bad record fails the whole document.
pub fn parse_events(body: &str) -> Result<Vec<NewEvent>> {
  let records: Vec<EventRecord> = serde_json::from_str(body)?;
  Ok(records.into_iter().map(NewEvent::from).collect())
}
