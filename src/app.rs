use crate::cache::{CacheValidity, KeyValueStore, SqliteKeyValue};
use crate::config::Config;
use crate::db::{BlogRecord, BlogStore, Database};
use crate::remote::{PostgrestClient, RemoteSource};
use crate::sync::{
  Bootstrapper, PushOutcome, SchedulerConfig, SyncEngine, SyncRun, SyncScheduler, SyncSession,
  TickOutcome,
};
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Snapshot of the sync state for display.
#[derive(Debug, Clone)]
pub struct Status {
  pub remote_configured: bool,
  pub last_sync: Option<DateTime<Utc>>,
  pub cache_valid: bool,
  pub ttl: Duration,
  pub expires_in: Duration,
  pub records: usize,
  pub scheduler: SchedulerConfig,
}

/// Owns every long-lived piece of the sync core.
pub struct App {
  store: BlogStore,
  remote: Arc<dyn RemoteSource>,
  cache: Arc<CacheValidity>,
  engine: Arc<SyncEngine>,
  scheduler: Arc<SyncScheduler>,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let db = Database::open(config.database_path.as_deref())?;
    let remote = Arc::new(PostgrestClient::new(&config.remote)?);
    let kv = Arc::new(SqliteKeyValue::new(db.clone()));

    Self::with_parts(config, db, remote, kv)
  }

  fn with_parts(
    config: &Config,
    db: Database,
    remote: Arc<dyn RemoteSource>,
    kv: Arc<dyn KeyValueStore>,
  ) -> Result<Self> {
    let store = BlogStore::new(db)?;

    let cache = Arc::new(CacheValidity::new(kv).with_ttl(config.sync.cache_ttl()));
    let engine = Arc::new(
      SyncEngine::new(store.clone(), Arc::clone(&remote))
        .with_single_flight(config.sync.single_flight),
    );
    let scheduler = Arc::new(
      SyncScheduler::new(Arc::clone(&engine), Arc::clone(&cache))
        .with_interval(config.sync.interval())
        .with_min_cache_ttl(config.sync.min_cache_ttl()),
    );

    Ok(Self {
      store,
      remote,
      cache,
      engine,
      scheduler,
    })
  }

  async fn mount(&self) -> SyncSession {
    let session = Bootstrapper::new(Arc::clone(&self.cache), Arc::clone(&self.scheduler))
      .mount()
      .await;
    if let Some(run) = session.initial_sync() {
      info!("Start-up sync: {}", run.report);
    }
    session
  }

  /// Mount the sync lifecycle and keep it running until Ctrl-C.
  pub async fn run(&self) -> Result<()> {
    let session = self.mount().await;

    let mut posts = self.store.observe();
    loop {
      tokio::select! {
        result = tokio::signal::ctrl_c() => {
          result.map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
          break;
        }
        update = posts.next() => match update {
          Some(records) => info!(
            "{} posts available, last sync {}",
            records.len(),
            self
              .cache
              .last_sync_cached()
              .map(|t| t.to_rfc3339())
              .unwrap_or_else(|| "never".to_string())
          ),
          None => break,
        },
      }
    }

    session.unmount();
    info!("Sync stopped");
    Ok(())
  }

  /// Like [`App::run`], but reports every change to the post `id`.
  pub async fn watch<F>(&self, id: &str, mut on_change: F) -> Result<()>
  where
    F: FnMut(Option<&BlogRecord>),
  {
    let session = self.mount().await;

    let mut post = self.store.observe_record(id);
    loop {
      tokio::select! {
        result = tokio::signal::ctrl_c() => {
          result.map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
          break;
        }
        update = post.next() => match update {
          Some(record) => on_change(record.as_ref()),
          None => break,
        },
      }
    }

    session.unmount();
    Ok(())
  }

  /// Sync if the cache is stale, or unconditionally with `force`.
  ///
  /// `None` when the cache was still fresh and nothing ran.
  pub async fn sync(&self, force: bool) -> Option<SyncRun> {
    self.cache.initialize().await;
    if force {
      return Some(self.scheduler.force_sync().await);
    }

    match self.scheduler.perform_background_sync().await {
      TickOutcome::Fresh => None,
      TickOutcome::Ran(run) => Some(run),
    }
  }

  pub async fn push(&self) -> PushOutcome {
    self.engine.push_to_remote().await
  }

  pub async fn clear_cache(&self) -> bool {
    self.cache.clear_cache().await
  }

  pub async fn status(&self) -> Result<Status> {
    let last_sync = self.cache.get_last_sync().await;

    Ok(Status {
      remote_configured: self.remote.is_configured(),
      last_sync,
      cache_valid: self.cache.is_cache_valid(None),
      ttl: self.cache.ttl(),
      expires_in: self.cache.time_until_expiry(None),
      records: self.store.count()?,
      scheduler: self.scheduler.config(),
    })
  }

  /// Posts, newest first.
  pub fn latest(&self) -> Result<Vec<BlogRecord>> {
    self.store.query_latest()
  }

  pub fn find(&self, id: &str) -> Result<Option<BlogRecord>> {
    self.store.find(id)
  }
}
