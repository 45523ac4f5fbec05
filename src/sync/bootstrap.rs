//! Start-up and tear-down of the sync machinery.

use std::sync::Arc;
use tracing::info;

use super::scheduler::{SyncRun, SyncScheduler};
use crate::cache::CacheValidity;

pub struct Bootstrapper {
  cache: Arc<CacheValidity>,
  scheduler: Arc<SyncScheduler>,
}

impl Bootstrapper {
  pub fn new(cache: Arc<CacheValidity>, scheduler: Arc<SyncScheduler>) -> Self {
    Self { cache, scheduler }
  }

  /// Load the cache state, sync once if it is stale, then start the
  /// background loop. The loop runs until the returned session is dropped.
  pub async fn mount(&self) -> SyncSession {
    self.cache.initialize().await;

    let initial_sync = if self.cache.is_cache_valid(None) {
      info!("Cache valid, using local data");
      None
    } else {
      info!("Cache stale, syncing before start");
      Some(self.scheduler.force_sync().await)
    };

    self.scheduler.start_periodic_sync(None);

    SyncSession {
      scheduler: Arc::clone(&self.scheduler),
      initial_sync,
    }
  }
}

/// A mounted sync lifecycle. Dropping it stops the background loop.
pub struct SyncSession {
  scheduler: Arc<SyncScheduler>,
  initial_sync: Option<SyncRun>,
}

impl SyncSession {
  /// The start-up sync, if the cache was stale.
  pub fn initial_sync(&self) -> Option<&SyncRun> {
    self.initial_sync.as_ref()
  }

  pub fn unmount(self) {}
}

impl Drop for SyncSession {
  fn drop(&mut self) {
    self.scheduler.stop_periodic_sync();
  }
}
