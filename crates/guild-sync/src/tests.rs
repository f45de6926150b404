//! Synchronizer tests against an in-memory store, a scripted feed and a
//! local HTTP server.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, TimeZone, Utc};
use guild_core::{repository::Repository, store::EventStore};
use guild_store_sqlite::SqliteStore;
use tokio::sync::Semaphore;

use crate::{
  FeedConfig, FeedError, FeedSource, HttpFeed, Preferences, Resource,
  SyncOutcome, Synchronizer,
};

const ORGS: &str = r#"[{"id":1,"name":"Drama Soc"}]"#;
const EVENTS: &str = r#"[{"url":"a","organiserId":1,"organiserName":"Drama Soc",
  "name":"Play Night","fromDate":"2025-01-01T19:00"}]"#;

fn at(day: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
}

// ─── Scripted feed ───────────────────────────────────────────────────────────

#[derive(Clone)]
struct Doc {
  modified: DateTime<Utc>,
  body:     String,
}

/// A feed whose documents can be swapped, removed or gated mid-test.
#[derive(Default)]
struct ScriptedFeed {
  docs:    Mutex<HashMap<Resource, Doc>>,
  fetches: AtomicUsize,
  gate:    Option<Arc<Semaphore>>,
}

impl ScriptedFeed {
  fn with(orgs: (DateTime<Utc>, &str), events: (DateTime<Utc>, &str)) -> Self {
    let feed = Self::default();
    feed.set(Resource::Organisations, orgs.0, orgs.1);
    feed.set(Resource::Events, events.0, events.1);
    feed
  }

  fn set(&self, resource: Resource, modified: DateTime<Utc>, body: &str) {
    self.docs.lock().unwrap().insert(resource, Doc {
      modified,
      body: body.to_owned(),
    });
  }

  fn take_down(&self, resource: Resource) {
    self.docs.lock().unwrap().remove(&resource);
  }

  fn doc(&self, resource: Resource) -> Result<Doc, FeedError> {
    self
      .docs
      .lock()
      .unwrap()
      .get(&resource)
      .cloned()
      .ok_or(FeedError::MissingLastModified(resource))
  }
}

impl FeedSource for ScriptedFeed {
  async fn last_modified(
    &self,
    resource: Resource,
  ) -> Result<DateTime<Utc>, FeedError> {
    if let Some(gate) = &self.gate {
      let _permit = gate.acquire().await.expect("gate open");
    }
    Ok(self.doc(resource)?.modified)
  }

  async fn fetch(&self, resource: Resource) -> Result<String, FeedError> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    Ok(self.doc(resource)?.body)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn repository() -> Arc<Repository<SqliteStore>> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Arc::new(Repository::new(store))
}

async fn row_counts(repo: &Repository<SqliteStore>) -> (usize, usize) {
  let store = repo.store();
  let orgs = store.organisations().await.unwrap().len();
  let events = store
    .events_after(DateTime::UNIX_EPOCH, None)
    .await
    .unwrap()
    .len();
  (orgs, events)
}

// ─── Synchronizer ────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_sync_fills_store_and_second_is_a_no_op() {
  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS));
  let sync = Synchronizer::new(repo.clone(), feed);

  let outcome = sync.run(at(1)).await.unwrap();
  assert_eq!(outcome, SyncOutcome::Synced {
    last_modified: at(3),
    organisations: 1,
    events:        1,
  });
  assert_eq!(row_counts(&repo).await, (1, 1));

  let events = repo
    .store()
    .events_after(DateTime::UNIX_EPOCH, Some(1))
    .await
    .unwrap();
  assert_eq!(events[0].organiser_id, 1);
  assert_eq!(events[0].name, "Play Night");

  let again = sync.run(at(3)).await.unwrap();
  assert_eq!(again.last_modified(), Some(at(3)));
  assert_eq!(row_counts(&repo).await, (1, 1));
}

#[tokio::test]
async fn forced_refetch_of_same_feed_is_idempotent() {
  let repo = repository().await;
  let sync = Synchronizer::new(
    repo.clone(),
    ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS)),
  );

  sync.run(at(1)).await.unwrap();
  let before = repo
    .store()
    .events_after(DateTime::UNIX_EPOCH, None)
    .await
    .unwrap();

  // An old timestamp makes both documents look stale again.
  sync.run(DateTime::UNIX_EPOCH).await.unwrap();
  let after = repo
    .store()
    .events_after(DateTime::UNIX_EPOCH, None)
    .await
    .unwrap();

  assert_eq!(before, after);
  assert_eq!(row_counts(&repo).await, (1, 1));
}

#[tokio::test]
async fn up_to_date_feed_is_not_downloaded() {
  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS));
  let sync = Synchronizer::new(repo.clone(), feed);

  let outcome = sync.run(at(5)).await.unwrap();
  assert_eq!(outcome, SyncOutcome::Synced {
    last_modified: at(3),
    organisations: 0,
    events:        0,
  });
  assert_eq!(sync.feed().fetches.load(Ordering::SeqCst), 0);
  assert_eq!(row_counts(&repo).await, (0, 0));
}

#[tokio::test]
async fn only_the_stale_document_is_downloaded() {
  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(9), EVENTS));
  let sync = Synchronizer::new(repo.clone(), feed);

  sync.run(at(1)).await.unwrap();
  let fetched_first = sync.feed().fetches.load(Ordering::SeqCst);
  assert_eq!(fetched_first, 2);

  sync.run(at(5)).await.unwrap();
  assert_eq!(sync.feed().fetches.load(Ordering::SeqCst), fetched_first + 1);
}

#[tokio::test]
async fn unreachable_feed_changes_nothing() {
  let repo = repository().await;
  let sync = Synchronizer::new(repo.clone(), ScriptedFeed::default());

  let dir = tempfile::tempdir().unwrap();
  let mut prefs = Preferences::load(dir.path().join("prefs.toml")).unwrap();

  let outcome = sync.sync_and_record(&mut prefs).await.unwrap();
  assert_eq!(outcome, SyncOutcome::NoUpdate);
  assert_eq!(row_counts(&repo).await, (0, 0));
  assert_eq!(prefs.last_updated(), DateTime::UNIX_EPOCH);
  assert!(!prefs.path().exists());
}

#[tokio::test]
async fn events_failure_keeps_organisations() {
  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS));
  feed.take_down(Resource::Events);
  let sync = Synchronizer::new(repo.clone(), feed);

  let outcome = sync.run(at(1)).await.unwrap();
  assert_eq!(outcome, SyncOutcome::NoUpdate);
  assert_eq!(row_counts(&repo).await, (1, 0));
}

#[tokio::test]
async fn malformed_payload_is_treated_as_no_update() {
  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(3), r#"[{"url":"a"}]"#));
  let sync = Synchronizer::new(repo.clone(), feed);

  assert_eq!(sync.run(at(1)).await.unwrap(), SyncOutcome::NoUpdate);
  assert_eq!(row_counts(&repo).await, (1, 0));

  let garbage = ScriptedFeed::with((at(2), "<html>oops</html>"), (at(3), EVENTS));
  let sync = Synchronizer::new(repository().await, garbage);
  assert_eq!(sync.run(at(1)).await.unwrap(), SyncOutcome::NoUpdate);
}

#[tokio::test]
async fn events_for_unknown_organiser_are_retried_once_it_appears() {
  const LATE_EVENTS: &str = r#"[{"url":"/e/7","organiserId":7,
    "organiserName":"Chess Soc","name":"Blitz","fromDate":"2025-01-05T18:00"}]"#;

  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(3), LATE_EVENTS));
  let sync = Synchronizer::new(repo.clone(), feed);

  let dir = tempfile::tempdir().unwrap();
  let mut prefs = Preferences::load(dir.path().join("prefs.toml")).unwrap();

  // Organiser 7 is not in the organisations document yet.
  let outcome = sync.sync_and_record(&mut prefs).await.unwrap();
  assert_eq!(outcome, SyncOutcome::NoUpdate);
  assert_eq!(prefs.last_updated(), DateTime::UNIX_EPOCH);
  assert_eq!(row_counts(&repo).await, (1, 0));

  // It turns up later; the events document itself is unchanged.
  sync.feed().set(
    Resource::Organisations,
    at(4),
    r#"[{"id":1,"name":"Drama Soc"},{"id":7,"name":"Chess Soc"}]"#,
  );
  let outcome = sync.sync_and_record(&mut prefs).await.unwrap();
  assert_eq!(outcome, SyncOutcome::Synced {
    last_modified: at(4),
    organisations: 2,
    events:        1,
  });
  assert_eq!(prefs.last_updated(), at(4));
  assert_eq!(row_counts(&repo).await, (2, 1));
}

#[tokio::test]
async fn recorded_timestamp_never_decreases() {
  let repo = repository().await;
  let feed = ScriptedFeed::with((at(2), ORGS), (at(8), EVENTS));
  let sync = Synchronizer::new(repo.clone(), feed);

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("prefs.toml");
  let mut prefs = Preferences::load(&path).unwrap();

  sync.sync_and_record(&mut prefs).await.unwrap();
  assert_eq!(prefs.last_updated(), at(8));

  // The feed is rolled back to older files.
  sync.feed().set(Resource::Organisations, at(4), ORGS);
  sync.feed().set(Resource::Events, at(5), EVENTS);
  let outcome = sync.sync_and_record(&mut prefs).await.unwrap();
  assert_eq!(outcome.last_modified(), Some(at(5)));
  assert_eq!(prefs.last_updated(), at(8));
  assert_eq!(Preferences::load(&path).unwrap().last_updated(), at(8));

  sync.feed().set(Resource::Events, at(10), EVENTS);
  sync.sync_and_record(&mut prefs).await.unwrap();
  assert_eq!(Preferences::load(&path).unwrap().last_updated(), at(10));
}

#[tokio::test]
async fn only_one_run_in_flight() {
  let repo = repository().await;
  let gate = Arc::new(Semaphore::new(0));
  let mut feed = ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS));
  feed.gate = Some(gate.clone());
  let sync = Arc::new(Synchronizer::new(repo.clone(), feed));

  let first = sync.spawn(at(1)).expect("first run starts");
  assert!(sync.spawn(at(1)).is_none());
  assert!(matches!(
    sync.run(at(1)).await,
    Err(crate::Error::AlreadyRunning)
  ));

  gate.add_permits(2);
  let outcome = first.await.expect("task joined").unwrap();
  assert_eq!(outcome.last_modified(), Some(at(3)));

  // The slot is free again once the run has reported.
  let second = sync.spawn(at(3)).expect("second run starts");
  gate.add_permits(2);
  second.await.expect("task joined").unwrap();
}

#[tokio::test]
async fn background_run_records_preferences() {
  let repo = repository().await;
  let sync = Arc::new(Synchronizer::new(
    repo.clone(),
    ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS)),
  ));

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("prefs.toml");
  let prefs = Preferences::load(&path).unwrap();

  let (outcome, prefs) = sync
    .spawn_and_record(prefs)
    .expect("run starts")
    .await
    .expect("task joined")
    .unwrap();
  assert_eq!(outcome.last_modified(), Some(at(3)));
  assert_eq!(prefs.last_updated(), at(3));
  assert_eq!(Preferences::load(&path).unwrap().last_updated(), at(3));
  assert_eq!(row_counts(&repo).await, (1, 1));
}

#[tokio::test]
async fn background_run_refused_while_another_is_in_flight() {
  let repo = repository().await;
  let gate = Arc::new(Semaphore::new(0));
  let mut feed = ScriptedFeed::with((at(2), ORGS), (at(3), EVENTS));
  feed.gate = Some(gate.clone());
  let sync = Arc::new(Synchronizer::new(repo, feed));

  let dir = tempfile::tempdir().unwrap();
  let prefs = Preferences::load(dir.path().join("prefs.toml")).unwrap();

  let first = sync.spawn(at(1)).expect("first run starts");
  assert!(sync.spawn_and_record(prefs.clone()).is_none());

  gate.add_permits(2);
  first.await.expect("task joined").unwrap();
  assert!(sync.spawn_and_record(prefs).is_some());
  gate.add_permits(2);
}

#[tokio::test]
async fn sync_feeds_live_queries() {
  let repo = repository().await;
  let upcoming = (Utc::now() + chrono::Duration::days(3))
    .format("%Y-%m-%dT%H:%M:%S")
    .to_string();
  let events = format!(
    r#"[{{"url":"/e/1","organiserId":1,"organiserName":"Drama Soc",
         "name":"Future Play","fromDate":"{upcoming}"}}]"#
  );
  let sync = Synchronizer::new(
    repo.clone(),
    ScriptedFeed::with((at(2), ORGS), (at(3), &events)),
  );

  let mut live = repo.all_events_from_now().await.unwrap();
  assert!(live.current().is_empty());

  sync.run(at(1)).await.unwrap();
  let next = tokio::time::timeout(std::time::Duration::from_secs(2), live.changed())
    .await
    .expect("live update")
    .expect("producer alive");
  assert_eq!(next.len(), 1);
  assert_eq!(next[0].name, "Future Play");
}

// ─── HTTP feed ───────────────────────────────────────────────────────────────

const ORGS_MODIFIED: &str = "Thu, 02 Jan 2025 12:00:00 GMT";
const EVENTS_MODIFIED: &str = "Fri, 03 Jan 2025 12:00:00 GMT";

async fn serve() -> String {
  use axum::{Router, http::header, routing::get};

  let app = Router::new()
    .route(
      "/organisations.json",
      get(|| async { ([(header::LAST_MODIFIED, ORGS_MODIFIED)], ORGS) }),
    )
    .route(
      "/events.json",
      get(|| async { ([(header::LAST_MODIFIED, EVENTS_MODIFIED)], EVENTS) }),
    )
    .route("/undated.json", get(|| async { "[]" }));

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await });
  format!("http://{addr}")
}

fn http_feed(orgs: String, events: String) -> HttpFeed {
  HttpFeed::new(FeedConfig::new(orgs, events)).expect("http client")
}

#[tokio::test]
async fn http_feed_reads_headers_and_bodies() {
  let base = serve().await;
  let feed = http_feed(
    format!("{base}/organisations.json"),
    format!("{base}/events.json"),
  );

  assert_eq!(
    feed.last_modified(Resource::Organisations).await.unwrap(),
    at(2)
  );
  assert_eq!(feed.last_modified(Resource::Events).await.unwrap(), at(3));
  assert_eq!(feed.fetch(Resource::Organisations).await.unwrap(), ORGS);
}

#[tokio::test]
async fn http_feed_end_to_end() {
  let base = serve().await;
  let repo = repository().await;
  let sync = Synchronizer::new(
    repo.clone(),
    http_feed(
      format!("{base}/organisations.json"),
      format!("{base}/events.json"),
    ),
  );

  let outcome = sync.run(DateTime::UNIX_EPOCH).await.unwrap();
  assert_eq!(outcome.last_modified(), Some(at(3)));
  assert_eq!(row_counts(&repo).await, (1, 1));
}

#[tokio::test]
async fn http_feed_errors() {
  let base = serve().await;
  let feed = http_feed(format!("{base}/missing.json"), format!("{base}/undated.json"));

  assert!(matches!(
    feed.last_modified(Resource::Organisations).await,
    Err(FeedError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
  ));
  assert!(matches!(
    feed.last_modified(Resource::Events).await,
    Err(FeedError::MissingLastModified(Resource::Events))
  ));
}

#[tokio::test]
async fn http_feed_unreachable_gives_no_update() {
  // Grab a free port, then close it again.
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let repo = repository().await;
  let feed = http_feed(
    format!("http://{addr}/organisations.json"),
    format!("http://{addr}/events.json"),
  );
  assert!(matches!(
    feed.last_modified(Resource::Organisations).await,
    Err(FeedError::Unreachable(Resource::Organisations, _))
  ));

  let sync = Synchronizer::new(repo.clone(), feed);
  assert_eq!(sync.run(at(1)).await.unwrap(), SyncOutcome::NoUpdate);
  assert_eq!(row_counts(&repo).await, (0, 0));
}
