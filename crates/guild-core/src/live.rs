//! Live-updating query results.
//!
//! A store hands out a [`LiveQuery`] per read. Behind each one a small task
//! waits for the store to commit a write to a relevant table, re-runs the
//! query and publishes the new snapshot if it differs from the last one.
//! The task exits once every handle for it has been dropped.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Commit signal for one table. Stores call [`Notifier::notify`] after each
/// committed write; live queries subscribe to the tables they read.
#[derive(Clone, Debug)]
pub struct Notifier {
  tx: Arc<watch::Sender<u64>>,
}

impl Default for Notifier {
  fn default() -> Self { Self::new() }
}

impl Notifier {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(0);
    Self { tx: Arc::new(tx) }
  }

  /// Record that a write to the table has committed.
  pub fn notify(&self) { self.tx.send_modify(|n| *n = n.wrapping_add(1)); }

  /// Subscribe before running the initial query so that a commit landing
  /// in between is not missed.
  pub fn subscribe(&self) -> watch::Receiver<u64> { self.tx.subscribe() }
}

// ─── LiveQuery ───────────────────────────────────────────────────────────────

/// A handle on the latest result of a query.
///
/// Cloning is cheap and yields another subscriber to the same producer.
#[derive(Debug)]
pub struct LiveQuery<T> {
  rx: watch::Receiver<T>,
}

impl<T> Clone for LiveQuery<T> {
  fn clone(&self) -> Self { Self { rx: self.rx.clone() } }
}

impl<T: Clone> LiveQuery<T> {
  /// The most recent snapshot.
  pub fn current(&self) -> T { self.rx.borrow().clone() }

  /// Wait for the next snapshot that differs from the last one seen by this
  /// handle. Returns `None` once the producer has stopped.
  pub async fn changed(&mut self) -> Option<T> {
    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().clone())
  }
}

impl<T> LiveQuery<T>
where
  T: Clone + PartialEq + Send + Sync + 'static,
{
  /// Start a producer for `query`, seeded with `initial`.
  ///
  /// The query is re-run whenever `commits` ticks, and additionally at the
  /// instant returned by `refresh_at` for the current snapshot (if any).
  /// Queries relative to "now" use that to drop entries as time passes.
  pub fn spawn<Q, Fut, E, R>(
    initial: T,
    mut commits: watch::Receiver<u64>,
    refresh_at: R,
    query: Q,
  ) -> Self
  where
    Q: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    R: Fn(&T) -> Option<DateTime<Utc>> + Send + 'static,
  {
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
      // The refresh instant already acted on, so an unchanged snapshot does
      // not fire the same timer again.
      let mut fired: Option<DateTime<Utc>> = None;

      loop {
        let due = refresh_at(&tx.borrow()).filter(|at| Some(*at) != fired);
        // An instant already in the past fires straight away.
        let wake_in = due.map(|at| {
          (at - Utc::now()).to_std().unwrap_or_default()
            + Duration::from_millis(1)
        });

        tokio::select! {
          _ = tx.closed() => break,
          changed = commits.changed() => {
            if changed.is_err() {
              break;
            }
          }
          _ = tokio::time::sleep(wake_in.unwrap_or_default()), if wake_in.is_some() => {
            fired = due;
          }
        }

        match query().await {
          Ok(next) => {
            tx.send_if_modified(|current| {
              if *current == next {
                false
              } else {
                *current = next;
                true
              }
            });
          }
          Err(e) => tracing::warn!(error = %e, "live query refresh failed"),
        }
      }
      tracing::trace!("live query producer stopped");
    });

    Self { rx }
  }
}
