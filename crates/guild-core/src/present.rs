//! Text the screens show for an event: dates, web address, share message.

use chrono::{DateTime, Utc};
use url::Url;

use crate::{model::Event, Result};

/// Site that relative event URLs in the feed belong to.
pub const DEFAULT_SITE_BASE: &str = "http://www.exeterguild.org";

/// `Wednesday, 1 January, 7:00 PM`
pub fn list_date(at: DateTime<Utc>) -> String {
  at.format("%A, %-d %B, %-I:%M %p").to_string()
}

/// `Wednesday, 1 January 2025 at 7:00 PM`
pub fn detail_date(at: DateTime<Utc>) -> String {
  at.format("%A, %-d %B %Y at %-I:%M %p").to_string()
}

/// The detail date, extended with the end time when there is one. An end on
/// the same day only shows its time.
pub fn date_range(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> String {
  let start = detail_date(from);
  match to {
    None => start,
    Some(end) if end.date_naive() == from.date_naive() => {
      format!("{start} until {}", end.format("%-I:%M %p"))
    }
    Some(end) => format!("{start} until {}", detail_date(end)),
  }
}

/// The message used when sharing an event.
pub fn share_text(url: &Url) -> String {
  format!("Hey! Check out this event: {url}")
}

impl Event {
  /// Address of the event's web page. Feed URLs without a scheme are paths on
  /// `site_base`; anything with a scheme (an external page) is used as is.
  pub fn web_url(&self, site_base: &Url) -> Result<Url> {
    match Url::parse(&self.url) {
      Ok(url) => Ok(url),
      Err(url::ParseError::RelativeUrlWithoutBase) => {
        Ok(site_base.join(&self.url)?)
      }
      Err(e) => Err(e.into()),
    }
  }
}
