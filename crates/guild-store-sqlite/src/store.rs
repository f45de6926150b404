//! [`SqliteStore`]: the SQLite implementation of [`EventStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use guild_core::{
  live::{LiveQuery, Notifier},
  model::{Event, EventId, NewEvent, Organisation, OrganisationId},
  store::EventStore,
};

use crate::{
  encode::{encode_dt, EncodedEvent, RawEvent, EVENT_COLUMNS},
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The local event cache, backed by a single SQLite file.
///
/// Cloning is cheap: the connection and the commit notifiers are
/// reference-counted, so clones share one database and one set of
/// subscribers.
#[derive(Clone)]
pub struct SqliteStore {
  conn:                 tokio_rusqlite::Connection,
  organisation_commits: Notifier,
  event_commits:        Notifier,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    Ok(Self {
      conn,
      organisation_commits: Notifier::new(),
      event_commits: Notifier::new(),
    })
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_organisations(
    &self,
    organisations: Vec<Organisation>,
  ) -> Result<usize> {
    if organisations.is_empty() {
      return Ok(0);
    }

    // ON CONFLICT DO UPDATE rather than INSERT OR REPLACE: a replace deletes
    // the old row first, which would cascade to its events.
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO organisation (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
          )?;
          for org in &organisations {
            stmt.execute(rusqlite::params![org.id, org.name])?;
          }
        }
        tx.commit()?;
        Ok(organisations.len())
      })
      .await?;

    self.organisation_commits.notify();
    tracing::debug!(written, "upserted organisations");
    Ok(written)
  }

  async fn upsert_events(&self, events: Vec<NewEvent>) -> Result<usize> {
    if events.is_empty() {
      return Ok(0);
    }

    let encoded: Vec<EncodedEvent> =
      events.into_iter().map(EncodedEvent::from).collect();

    let (written, orphans) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0usize;
        let mut orphans = Vec::new();
        {
          let mut organiser_exists =
            tx.prepare("SELECT 1 FROM organisation WHERE id = ?1")?;
          let mut upsert = tx.prepare(
            "INSERT INTO event (
               url, organiser_id, organiser_name, name,
               from_date, to_date, location, description
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(url) DO UPDATE SET
               organiser_id   = excluded.organiser_id,
               organiser_name = excluded.organiser_name,
               name           = excluded.name,
               from_date      = excluded.from_date,
               to_date        = excluded.to_date,
               location       = excluded.location,
               description    = excluded.description",
          )?;

          for event in encoded {
            if !organiser_exists.exists(rusqlite::params![event.organiser_id])? {
              orphans.push((event.url, event.organiser_id));
              continue;
            }
            upsert.execute(rusqlite::params![
              event.url,
              event.organiser_id,
              event.organiser_name,
              event.name,
              event.from_date,
              event.to_date,
              event.location,
              event.description,
            ])?;
            written += 1;
          }
        }
        tx.commit()?;
        Ok((written, orphans))
      })
      .await?;

    for (url, organiser_id) in &orphans {
      tracing::warn!(%url, organiser_id, "skipping event with unknown organiser");
    }

    if written > 0 {
      self.event_commits.notify();
    }
    tracing::debug!(written, skipped = orphans.len(), "upserted events");
    Ok(written)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn organisations(&self) -> Result<Vec<Organisation>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name FROM organisation ORDER BY name, id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Organisation {
              id:   row.get(0)?,
              name: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn events_after(
    &self,
    now:       DateTime<Utc>,
    organiser: Option<OrganisationId>,
  ) -> Result<Vec<Event>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {EVENT_COLUMNS}
           FROM event
           WHERE from_date > ?1
             AND (?2 IS NULL OR organiser_id = ?2)
           ORDER BY from_date ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![now_str, organiser], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn event(&self, id: EventId) -> Result<Option<Event>> {
    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM event WHERE id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawEvent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  // ── Live reads ────────────────────────────────────────────────────────────

  async fn watch_organisations(&self) -> Result<LiveQuery<Vec<Organisation>>> {
    let commits = self.organisation_commits.subscribe();
    let initial = self.organisations().await?;
    let store = self.clone();

    Ok(LiveQuery::spawn(initial, commits, |_: &Vec<Organisation>| None, move || {
      let store = store.clone();
      async move { store.organisations().await }
    }))
  }

  async fn watch_events_from_now(
    &self,
    organiser: Option<OrganisationId>,
  ) -> Result<LiveQuery<Vec<Event>>> {
    let commits = self.event_commits.subscribe();
    let initial = self.events_after(Utc::now(), organiser).await?;
    let store = self.clone();

    // The earliest event leaves the list once it starts.
    let next_start = |events: &Vec<Event>| events.first().map(|e| e.from_date);

    Ok(LiveQuery::spawn(initial, commits, next_start, move || {
      let store = store.clone();
      async move { store.events_after(Utc::now(), organiser).await }
    }))
  }

  async fn watch_event(&self, id: EventId) -> Result<LiveQuery<Option<Event>>> {
    let commits = self.event_commits.subscribe();
    let initial = self.event(id).await?;
    let store = self.clone();

    Ok(LiveQuery::spawn(initial, commits, |_: &Option<Event>| None, move || {
      let store = store.clone();
      async move { store.event(id).await }
    }))
  }
}
