//! Periodic background sync.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::engine::{SyncEngine, SyncReport};
use crate::cache::CacheValidity;

/// Default period between background sync attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// A background tick skips the sync while the last one is younger than this.
pub const MIN_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A sync that ran, and whether its timestamp was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRun {
  pub report: SyncReport,
  /// Whether the last sync time was persisted afterwards
  pub recorded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
  /// Cache still fresh, nothing done
  Fresh,
  Ran(SyncRun),
}

/// Scheduler settings as currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
  pub interval: Duration,
  pub min_cache_ttl: Duration,
  pub is_running: bool,
}

/// What a tick needs, cloned into the timer task.
#[derive(Clone)]
struct Runner {
  engine: Arc<SyncEngine>,
  cache: Arc<CacheValidity>,
  min_cache_ttl: Duration,
}

impl Runner {
  async fn tick(&self) -> TickOutcome {
    if self.cache.is_cache_valid(Some(self.min_cache_ttl)) {
      debug!("Cache valid, skipping background sync");
      return TickOutcome::Fresh;
    }

    info!("Running background sync");
    TickOutcome::Ran(self.sync_and_record().await)
  }

  async fn sync_and_record(&self) -> SyncRun {
    let started = Instant::now();
    let report = self.engine.full_sync().await;

    // A collapsed call leaves recording to the sync that is still running
    let recorded = report.is_completed() && self.cache.update_last_sync().await;

    info!(
      "Sync finished in {}ms: {}",
      started.elapsed().as_millis(),
      report
    );
    SyncRun { report, recorded }
  }
}

/// Owns the recurring sync timer. Idle until started; at most one timer runs.
pub struct SyncScheduler {
  runner: Runner,
  interval: Duration,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
  pub fn new(engine: Arc<SyncEngine>, cache: Arc<CacheValidity>) -> Self {
    Self {
      runner: Runner {
        engine,
        cache,
        min_cache_ttl: MIN_CACHE_TTL,
      },
      interval: DEFAULT_INTERVAL,
      task: Mutex::new(None),
    }
  }

  /// Set the default period used when `start_periodic_sync` gets no override.
  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  /// Set the freshness floor checked on every tick.
  pub fn with_min_cache_ttl(mut self, min_cache_ttl: Duration) -> Self {
    self.runner.min_cache_ttl = min_cache_ttl;
    self
  }

  /// Start (or restart) the timer. The first attempt happens right away.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start_periodic_sync(&self, interval_override: Option<Duration>) {
    let mut interval = interval_override.unwrap_or(self.interval);
    if interval.is_zero() {
      warn!("Sync interval must be positive, using the default");
      interval = DEFAULT_INTERVAL;
    }

    let mut task = self.task();
    if let Some(previous) = task.take() {
      previous.abort();
    }

    info!("Starting periodic sync every {}s", interval.as_secs());
    let runner = self.runner.clone();
    *task = Some(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        ticker.tick().await;
        if AssertUnwindSafe(runner.tick()).catch_unwind().await.is_err() {
          error!("Background sync panicked, will retry on next tick");
        }
      }
    }));
  }

  /// Stop the timer. Safe to call when already stopped.
  pub fn stop_periodic_sync(&self) {
    if let Some(handle) = self.task().take() {
      handle.abort();
      info!("Periodic sync stopped");
    }
  }

  /// One tick's worth of work, outside the timer.
  pub async fn perform_background_sync(&self) -> TickOutcome {
    self.runner.tick().await
  }

  /// Sync now regardless of cache state. Does not start or stop the timer.
  pub async fn force_sync(&self) -> SyncRun {
    info!("Forcing immediate sync");
    self.runner.sync_and_record().await
  }

  pub fn is_running(&self) -> bool {
    self.task().is_some()
  }

  pub fn config(&self) -> SchedulerConfig {
    SchedulerConfig {
      interval: self.interval,
      min_cache_ttl: self.runner.min_cache_ttl,
      is_running: self.is_running(),
    }
  }

  fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    // The handle slot is valid even if a holder panicked
    self
      .task
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Drop for SyncScheduler {
  fn drop(&mut self) {
    self.stop_periodic_sync();
  }
}
