//! `guild-events`: browse the student union's events from a local cache.
//!
//! Reads `guild-events.toml` (or the path given with `--config`), opens the
//! SQLite cache, and brings it up to date from the feed before showing
//! anything that needs fresh data.
//!
//! # Usage
//!
//! ```
//! guild-events sync
//! guild-events events --organiser 12
//! guild-events show 48
//! guild-events watch
//! ```

mod render;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use guild_core::{
  model::{EventId, OrganisationId},
  repository::Repository,
};
use guild_store_sqlite::SqliteStore;
use guild_sync::{HttpFeed, Preferences, SyncOutcome, Synchronizer};
use tokio::task::JoinHandle;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::AppConfig;

type Repo = Repository<SqliteStore>;

#[derive(Parser)]
#[command(author, version, about = "Student union events, cached locally")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "guild-events.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Bring the local cache up to date with the feed.
  Sync,
  /// List cached organisations.
  Organisations,
  /// List upcoming events.
  Events {
    /// Only events organised by this organisation.
    #[arg(long, value_name = "ID")]
    organiser: Option<OrganisationId>,
    /// Use the cache as is, without contacting the feed.
    #[arg(long)]
    offline:   bool,
  },
  /// Show one event in full.
  Show { id: EventId },
  /// Keep the event list on screen, reprinting it whenever it changes.
  Watch {
    #[arg(long, value_name = "ID")]
    organiser: Option<OrganisationId>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let repository = Arc::new(Repository::new(store));

  match cli.command {
    Command::Sync => {
      sync(&cfg, &repository).await?;
    }
    Command::Organisations => {
      let live = repository.all_organisations().await?;
      print!("{}", render::organisations(&live.current()));
    }
    Command::Events { organiser, offline } => {
      if !offline {
        sync(&cfg, &repository).await?;
      }
      let live = match organiser {
        Some(id) => repository.events_organised_by(id).await?,
        None => repository.all_events_from_now().await?,
      };
      print!("{}", render::event_list(&live.current()));
    }
    Command::Show { id } => {
      let event = repository
        .event(id)
        .await?
        .current()
        .with_context(|| format!("no event with id {id}"))?;
      print!("{}", render::event_detail(&event, &cfg.site_base()?)?);
    }
    Command::Watch { organiser } => watch(&cfg, repository, organiser).await?,
  }

  Ok(())
}

/// Start a background sync that records its timestamp in the preferences
/// file.
fn start_sync(
  cfg: &AppConfig,
  repository: &Arc<Repo>,
) -> Result<JoinHandle<guild_sync::Result<(SyncOutcome, Preferences)>>> {
  let feed = HttpFeed::new(cfg.feed()?.clone())?;
  let synchronizer = Arc::new(Synchronizer::new(Arc::clone(repository), feed));
  let prefs = Preferences::load(&cfg.prefs_path)?;
  synchronizer
    .spawn_and_record(prefs)
    .context("a sync is already running")
}

async fn sync(cfg: &AppConfig, repository: &Arc<Repo>) -> Result<()> {
  let (outcome, _) = start_sync(cfg, repository)?
    .await
    .context("sync task panicked")??;
  eprint!("{}", render::sync_outcome(&outcome));
  Ok(())
}

/// Print the list now, then again on every change, while a sync runs in the
/// background. Returns on Ctrl-C.
async fn watch(
  cfg: &AppConfig,
  repository: Arc<Repo>,
  organiser: Option<OrganisationId>,
) -> Result<()> {
  let mut live = match organiser {
    Some(id) => repository.events_organised_by(id).await?,
    None => repository.all_events_from_now().await?,
  };
  print!("{}", render::event_list(&live.current()));

  let mut sync_task = start_sync(cfg, &repository)?;
  let mut syncing = true;

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      joined = &mut sync_task, if syncing => {
        syncing = false;
        match joined.context("sync task panicked")? {
          Ok((outcome, _)) => eprint!("{}", render::sync_outcome(&outcome)),
          Err(e) => tracing::error!(error = %e, "sync failed"),
        }
      }
      next = live.changed() => match next {
        Some(events) => {
          println!();
          print!("{}", render::event_list(&events));
        }
        None => break,
      },
    }
  }

  if syncing {
    sync_task.abort();
  }
  Ok(())
}
