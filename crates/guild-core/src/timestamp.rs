//! Parsing of the timestamps found in feed payloads.
//!
//! The feed is hand-maintained and has carried several spellings of the same
//! instant over time. Values without a zone are UTC. Precision below a
//! millisecond is dropped, matching what the local store keeps.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// Zone-less layouts, tried in order after RFC 3339.
/// `%.f` also matches when there is no fractional part.
const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
];

/// Parse a feed timestamp.
///
/// Accepts `2025-01-01T19:00:00Z`, `2025-01-01T19:00:00+01:00`,
/// `2025-01-01T19:00`, `2025-01-01T19:00:00` and `2025-01-01 19:00:00.0`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
  let s = raw.trim();

  let parsed = match DateTime::parse_from_rfc3339(s) {
    Ok(dt) => dt.with_timezone(&Utc),
    Err(_) => NAIVE_FORMATS
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
      .map(|naive| naive.and_utc())
      .ok_or_else(|| Error::InvalidTimestamp(raw.to_owned()))?,
  };
  Ok(parsed.trunc_subsecs(3))
}

/// `#[serde(deserialize_with = "..")]` adapter for a required timestamp.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// `#[serde(deserialize_with = "..")]` adapter for an optional timestamp.
/// `null`, a missing field and an empty string all mean "no timestamp".
pub fn deserialize_option<'de, D>(
  deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<String>::deserialize(deserializer)? {
    Some(raw) if !raw.trim().is_empty() => {
      parse_timestamp(&raw).map(Some).map_err(serde::de::Error::custom)
    }
    _ => Ok(None),
  }
}
