//! Plain-text screens.

use std::fmt::Write as _;

use guild_core::{
  model::{Event, Organisation},
  present,
};
use guild_sync::SyncOutcome;
use url::Url;

pub fn organisations(orgs: &[Organisation]) -> String {
  if orgs.is_empty() {
    return "No organisations cached. Run `guild-events sync`.\n".to_owned();
  }
  let mut out = String::new();
  for org in orgs {
    let _ = writeln!(out, "{:>6}  {}", org.id, org.name);
  }
  out
}

/// One line per event: local id, start, name and organiser.
pub fn event_list(events: &[Event]) -> String {
  if events.is_empty() {
    return "No upcoming events.\n".to_owned();
  }
  let mut out = String::new();
  for event in events {
    let _ = writeln!(
      out,
      "{:>6}  {}  {} ({})",
      event.id,
      present::list_date(event.from_date),
      event.name,
      event.organiser_name,
    );
  }
  out
}

pub fn event_detail(event: &Event, site_base: &Url) -> guild_core::Result<String> {
  let url = event.web_url(site_base)?;

  let mut out = String::new();
  let _ = writeln!(out, "{}", event.organiser_name);
  let _ = writeln!(out, "{}", event.name);
  let _ = writeln!(out, "{}", present::date_range(event.from_date, event.to_date));
  if let Some(location) = &event.location {
    let _ = writeln!(out, "{location}");
  }
  if let Some(description) = &event.description {
    let _ = writeln!(out, "\n{description}\n");
  }
  let _ = writeln!(out, "{url}");
  let _ = writeln!(out, "{}", present::share_text(&url));
  Ok(out)
}

pub fn sync_outcome(outcome: &SyncOutcome) -> String {
  match outcome {
    SyncOutcome::Synced {
      last_modified,
      organisations,
      events,
    } => format!(
      "Feed last modified {}: {organisations} organisations and {events} events written.\n",
      last_modified.to_rfc3339(),
    ),
    SyncOutcome::NoUpdate => {
      "Feed not applied; showing cached events.\n".to_owned()
    }
  }
}
