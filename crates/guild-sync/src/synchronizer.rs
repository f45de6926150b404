//! [`Synchronizer`]: one-shot "is the feed newer? then download and upsert".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{sync::Mutex, task::JoinHandle};

use guild_core::{feed, repository::Repository, store::EventStore};

use crate::{Error, FeedError, FeedSource, Preferences, Resource, Result};

/// How a sync run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Both timestamps were read. Any stale document was re-downloaded and
  /// written. `last_modified` is the later of the two remote timestamps.
  Synced {
    last_modified: DateTime<Utc>,
    organisations: usize,
    events:        usize,
  },
  /// The feed could not be used, or some of its events could not be
  /// written. Organisations may already have been written when the events
  /// document was the one that failed.
  NoUpdate,
}

impl SyncOutcome {
  pub fn last_modified(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Synced { last_modified, .. } => Some(*last_modified),
      Self::NoUpdate => None,
    }
  }
}

/// Brings the local cache up to date with the feed.
///
/// At most one run is in flight per `Synchronizer`.
pub struct Synchronizer<S: EventStore, F: FeedSource> {
  repository: Arc<Repository<S>>,
  feed:       F,
  in_flight:  Arc<Mutex<()>>,
}

impl<S, F> Synchronizer<S, F>
where
  S: EventStore,
  F: FeedSource,
{
  pub fn new(repository: Arc<Repository<S>>, feed: F) -> Self {
    Self {
      repository,
      feed,
      in_flight: Arc::new(Mutex::new(())),
    }
  }

  pub fn feed(&self) -> &F { &self.feed }

  /// Run once against `last_updated`, the feed timestamp the cache already
  /// reflects.
  ///
  /// Feed problems end the run as [`SyncOutcome::NoUpdate`]. Only store
  /// failures and a concurrent run are errors.
  pub async fn run(&self, last_updated: DateTime<Utc>) -> Result<SyncOutcome> {
    let _guard = self
      .in_flight
      .try_lock()
      .map_err(|_| Error::AlreadyRunning)?;
    self.sync_once(last_updated).await
  }

  /// Run once starting from the stored timestamp and store the new one.
  pub async fn sync_and_record(
    &self,
    prefs: &mut Preferences,
  ) -> Result<SyncOutcome> {
    let outcome = self.run(prefs.last_updated()).await?;
    record(prefs, &outcome)?;
    Ok(outcome)
  }

  async fn sync_once(&self, last_updated: DateTime<Utc>) -> Result<SyncOutcome> {
    tracing::debug!(%last_updated, "checking feed");

    let organisations_modified =
      match self.feed.last_modified(Resource::Organisations).await {
        Ok(at) => at,
        Err(e) => return Ok(no_update(e)),
      };

    let mut organisations = 0;
    if last_updated < organisations_modified {
      let records =
        match self.pull(Resource::Organisations, feed::parse_organisations).await {
          Ok(records) => records,
          Err(e) => return Ok(no_update(e)),
        };
      organisations = self
        .repository
        .insert_all_organisations(records)
        .await
        .map_err(Error::store)?;
    } else {
      tracing::debug!(%organisations_modified, "organisations up to date");
    }

    let events_modified = match self.feed.last_modified(Resource::Events).await {
      Ok(at) => at,
      Err(e) => return Ok(no_update(e)),
    };

    let mut events = 0;
    if last_updated < events_modified {
      let records = match self.pull(Resource::Events, feed::parse_events).await {
        Ok(records) => records,
        Err(e) => return Ok(no_update(e)),
      };
      let received = records.len();
      events = self
        .repository
        .insert_all_events(records)
        .await
        .map_err(Error::store)?;

      // Skipped events must be pulled again once their organiser exists, so
      // the events document does not count as applied.
      if events < received {
        tracing::warn!(
          skipped = received - events,
          %events_modified,
          "events document only partly applied, will retry"
        );
        return Ok(SyncOutcome::NoUpdate);
      }
    } else {
      tracing::debug!(%events_modified, "events up to date");
    }

    let last_modified = organisations_modified.max(events_modified);
    tracing::info!(%last_modified, organisations, events, "sync finished");

    Ok(SyncOutcome::Synced {
      last_modified,
      organisations,
      events,
    })
  }

  async fn pull<T>(
    &self,
    resource: Resource,
    parse: fn(&str) -> guild_core::Result<Vec<T>>,
  ) -> Result<Vec<T>, FeedError> {
    let body = self.feed.fetch(resource).await?;
    parse(&body).map_err(|e| FeedError::Malformed(resource, e))
  }
}

impl<S, F> Synchronizer<S, F>
where
  S: EventStore + 'static,
  F: FeedSource + 'static,
{
  /// Start a run on a background task. Returns `None` without starting
  /// anything when a run is already in flight. The handle resolves exactly
  /// once with the run's outcome.
  pub fn spawn(
    self: &Arc<Self>,
    last_updated: DateTime<Utc>,
  ) -> Option<JoinHandle<Result<SyncOutcome>>> {
    let guard = self.in_flight.clone().try_lock_owned().ok()?;
    let this = Arc::clone(self);

    Some(tokio::spawn(async move {
      let _guard = guard;
      this.sync_once(last_updated).await
    }))
  }

  /// [`Self::sync_and_record`] on a background task. The task owns `prefs`
  /// and hands them back with the outcome. Returns `None` when a run is
  /// already in flight.
  pub fn spawn_and_record(
    self: &Arc<Self>,
    mut prefs: Preferences,
  ) -> Option<JoinHandle<Result<(SyncOutcome, Preferences)>>> {
    let guard = self.in_flight.clone().try_lock_owned().ok()?;
    let this = Arc::clone(self);

    Some(tokio::spawn(async move {
      let _guard = guard;
      let outcome = this.sync_once(prefs.last_updated()).await?;
      record(&mut prefs, &outcome)?;
      Ok((outcome, prefs))
    }))
  }
}

/// Persist the outcome's timestamp if it moves the stored one forward.
fn record(prefs: &mut Preferences, outcome: &SyncOutcome) -> Result<()> {
  if let Some(at) = outcome.last_modified()
    && prefs.record_last_updated(at)
  {
    prefs.save()?;
    tracing::debug!(%at, path = %prefs.path().display(), "recorded last update");
  }
  Ok(())
}

fn no_update(e: FeedError) -> SyncOutcome {
  tracing::warn!(error = %e, "feed unavailable, keeping cached events");
  SyncOutcome::NoUpdate
}
