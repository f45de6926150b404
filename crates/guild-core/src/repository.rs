//! [`Repository`]: the only collaborator the presentation layer talks to.
//!
//! It renames [`EventStore`] operations into the vocabulary the screens use
//! and remembers the live handles it has handed out, so two screens asking
//! for the same list share one producer.

use std::collections::HashMap;

use tokio::sync::{Mutex, OnceCell};

use crate::{
  live::LiveQuery,
  model::{Event, EventId, NewEvent, Organisation, OrganisationId},
  store::EventStore,
};

pub struct Repository<S: EventStore> {
  store:           S,
  organisations:   OnceCell<LiveQuery<Vec<Organisation>>>,
  events_from_now: OnceCell<LiveQuery<Vec<Event>>>,
  organised_by:    Mutex<HashMap<OrganisationId, LiveQuery<Vec<Event>>>>,
  events:          Mutex<HashMap<EventId, LiveQuery<Option<Event>>>>,
}

impl<S: EventStore> Repository<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      organisations: OnceCell::new(),
      events_from_now: OnceCell::new(),
      organised_by: Mutex::new(HashMap::new()),
      events: Mutex::new(HashMap::new()),
    }
  }

  /// The underlying store, for one-shot reads.
  pub fn store(&self) -> &S { &self.store }

  // ── Live reads ────────────────────────────────────────────────────────────

  pub async fn all_organisations(
    &self,
  ) -> Result<LiveQuery<Vec<Organisation>>, S::Error> {
    self
      .organisations
      .get_or_try_init(|| self.store.watch_organisations())
      .await
      .cloned()
  }

  pub async fn all_events_from_now(
    &self,
  ) -> Result<LiveQuery<Vec<Event>>, S::Error> {
    self
      .events_from_now
      .get_or_try_init(|| self.store.watch_events_from_now(None))
      .await
      .cloned()
  }

  pub async fn events_organised_by(
    &self,
    organiser_id: OrganisationId,
  ) -> Result<LiveQuery<Vec<Event>>, S::Error> {
    let mut cache = self.organised_by.lock().await;
    if let Some(live) = cache.get(&organiser_id) {
      return Ok(live.clone());
    }
    let live = self.store.watch_events_from_now(Some(organiser_id)).await?;
    cache.insert(organiser_id, live.clone());
    Ok(live)
  }

  pub async fn event(
    &self,
    id: EventId,
  ) -> Result<LiveQuery<Option<Event>>, S::Error> {
    let mut cache = self.events.lock().await;
    if let Some(live) = cache.get(&id) {
      return Ok(live.clone());
    }
    let live = self.store.watch_event(id).await?;
    cache.insert(id, live.clone());
    Ok(live)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  pub async fn insert_event(&self, event: NewEvent) -> Result<usize, S::Error> {
    self.store.upsert_events(vec![event]).await
  }

  pub async fn insert_organisation(
    &self,
    organisation: Organisation,
  ) -> Result<usize, S::Error> {
    self.store.upsert_organisations(vec![organisation]).await
  }

  pub async fn insert_all_events(
    &self,
    events: Vec<NewEvent>,
  ) -> Result<usize, S::Error> {
    self.store.upsert_events(events).await
  }

  pub async fn insert_all_organisations(
    &self,
    organisations: Vec<Organisation>,
  ) -> Result<usize, S::Error> {
    self.store.upsert_organisations(organisations).await
  }
}
