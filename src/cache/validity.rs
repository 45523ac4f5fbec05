//! TTL gate over the last successful sync timestamp.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::storage::KeyValueStore;

/// Default time before a sync is considered stale.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const LAST_SYNC_KEY: &str = "last_sync_at";

fn millis(d: Duration) -> i64 {
  i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn to_datetime(ms: i64) -> Option<DateTime<Utc>> {
  DateTime::from_timestamp_millis(ms)
}

/// Whether a sync at `last_sync` is still fresh at `now` (all epoch millis).
pub fn is_fresh(last_sync: i64, now: i64, ttl: Duration) -> bool {
  now.saturating_sub(last_sync) < millis(ttl)
}

/// Remaining lifetime of a sync at `last_sync`, clamped at zero.
pub fn remaining(last_sync: i64, now: i64, ttl: Duration) -> Duration {
  let left = last_sync.saturating_add(millis(ttl)).saturating_sub(now);
  Duration::from_millis(u64::try_from(left).unwrap_or(0))
}

/// Tracks when the last successful sync happened.
///
/// The durable store is the source of truth. An in-memory mirror serves the
/// synchronous checks; it stays empty (cache invalid) until [`initialize`]
/// or [`update_last_sync`] fills it.
///
/// [`initialize`]: CacheValidity::initialize
/// [`update_last_sync`]: CacheValidity::update_last_sync
pub struct CacheValidity {
  storage: Arc<dyn KeyValueStore>,
  ttl: Duration,
  last_sync: RwLock<Option<i64>>,
}

impl CacheValidity {
  pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
    Self {
      storage,
      ttl: DEFAULT_TTL,
      last_sync: RwLock::new(None),
    }
  }

  /// Set the default TTL used when no override is given.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Load the persisted timestamp into memory.
  pub async fn initialize(&self) {
    self.get_last_sync().await;
  }

  /// Check the mirror against the TTL. Never loads from storage.
  pub fn is_cache_valid(&self, ttl_override: Option<Duration>) -> bool {
    let Some(last_sync) = self.mirror() else {
      return false;
    };

    let ttl = ttl_override.unwrap_or(self.ttl);
    let now = Utc::now().timestamp_millis();
    let valid = is_fresh(last_sync, now, ttl);

    if valid {
      debug!(
        "Cache valid, next sync in {}s",
        remaining(last_sync, now, ttl).as_secs_f64().ceil()
      );
    } else {
      debug!("Cache expired, last sync at {:?}", to_datetime(last_sync));
    }

    valid
  }

  /// Record a successful sync at the current time.
  ///
  /// Returns whether the timestamp was persisted. The mirror is only moved
  /// forward when it was.
  pub async fn update_last_sync(&self) -> bool {
    let now = Utc::now().timestamp_millis();

    match self.storage.set(LAST_SYNC_KEY, &now.to_string()).await {
      Ok(()) => {
        self.set_mirror(Some(now));
        info!("Last sync updated to {:?}", to_datetime(now));
        true
      }
      Err(e) => {
        error!("Failed to persist last sync time: {}", e);
        false
      }
    }
  }

  /// Read the timestamp from durable storage, refreshing the mirror.
  ///
  /// If storage cannot be read the mirror is kept and reported instead.
  pub async fn get_last_sync(&self) -> Option<DateTime<Utc>> {
    let stored = match self.storage.get(LAST_SYNC_KEY).await {
      Ok(v) => v,
      Err(e) => {
        error!("Failed to read last sync time: {}", e);
        return self.last_sync_cached();
      }
    };

    let parsed = stored.and_then(|raw| match raw.trim().parse::<i64>() {
      Ok(ms) => Some(ms),
      Err(e) => {
        warn!("Ignoring unreadable last sync value {:?}: {}", raw, e);
        None
      }
    });

    self.set_mirror(parsed);
    parsed.and_then(to_datetime)
  }

  /// The in-memory value, without touching storage.
  pub fn last_sync_cached(&self) -> Option<DateTime<Utc>> {
    self.mirror().and_then(to_datetime)
  }

  /// Forget the last sync so the next check forces a sync.
  pub async fn clear_cache(&self) -> bool {
    match self.storage.delete(LAST_SYNC_KEY).await {
      Ok(()) => {
        self.set_mirror(None);
        info!("Cache cleared");
        true
      }
      Err(e) => {
        error!("Failed to clear cache: {}", e);
        false
      }
    }
  }

  /// Time left before the cache expires, zero if it already has or was never set.
  pub fn time_until_expiry(&self, ttl_override: Option<Duration>) -> Duration {
    match self.mirror() {
      Some(last_sync) => remaining(
        last_sync,
        Utc::now().timestamp_millis(),
        ttl_override.unwrap_or(self.ttl),
      ),
      None => Duration::ZERO,
    }
  }

  fn mirror(&self) -> Option<i64> {
    match self.last_sync.read() {
      Ok(guard) => *guard,
      Err(e) => {
        error!("Cache state unavailable: {}", e);
        None
      }
    }
  }

  fn set_mirror(&self, value: Option<i64>) {
    match self.last_sync.write() {
      Ok(mut guard) => *guard = value,
      Err(e) => error!("Cache state unavailable: {}", e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{FailingKeyValue, MemoryKeyValue};

  const MINUTE: i64 = 60_000;

  async fn with_last_sync(ms: i64) -> CacheValidity {
    let kv = MemoryKeyValue::default();
    kv.set(LAST_SYNC_KEY, &ms.to_string()).await.unwrap();
    let cache = CacheValidity::new(Arc::new(kv));
    cache.initialize().await;
    cache
  }

  #[test]
  fn test_is_fresh_boundaries() {
    let ttl = Duration::from_secs(300);
    assert!(is_fresh(1_000, 1_000, ttl));
    assert!(is_fresh(0, 5 * MINUTE - 1, ttl));
    assert!(!is_fresh(0, 5 * MINUTE, ttl));
    assert!(!is_fresh(0, 6 * MINUTE, ttl));
    assert!(!is_fresh(0, 0, Duration::ZERO));
  }

  #[test]
  fn test_remaining_is_clamped() {
    let ttl = Duration::from_secs(300);
    assert_eq!(remaining(0, MINUTE, ttl), Duration::from_secs(240));
    assert_eq!(remaining(0, 5 * MINUTE, ttl), Duration::ZERO);
    assert_eq!(remaining(0, 60 * MINUTE, ttl), Duration::ZERO);
  }

  #[tokio::test]
  async fn test_invalid_before_initialize() {
    let kv = MemoryKeyValue::default();
    kv.set(LAST_SYNC_KEY, &Utc::now().timestamp_millis().to_string())
      .await
      .unwrap();
    let cache = CacheValidity::new(Arc::new(kv));

    assert!(!cache.is_cache_valid(None));
    assert_eq!(cache.time_until_expiry(None), Duration::ZERO);

    cache.initialize().await;
    assert!(cache.is_cache_valid(None));
  }

  #[tokio::test]
  async fn test_six_minutes_old_is_expired() {
    let cache = with_last_sync(Utc::now().timestamp_millis() - 6 * MINUTE).await;

    assert!(!cache.is_cache_valid(None));
    assert!(cache.is_cache_valid(Some(Duration::from_secs(10 * 60))));
    assert_eq!(cache.time_until_expiry(None), Duration::ZERO);
  }

  #[tokio::test]
  async fn test_time_until_expiry_counts_down() {
    let cache = with_last_sync(Utc::now().timestamp_millis() - 2 * MINUTE).await;

    let left = cache.time_until_expiry(None);
    assert!(left <= Duration::from_secs(180));
    assert!(left > Duration::from_secs(170));
  }

  #[tokio::test]
  async fn test_update_then_valid() {
    let cache = CacheValidity::new(Arc::new(MemoryKeyValue::default()));

    assert!(cache.update_last_sync().await);
    assert!(cache.is_cache_valid(None));
    assert!(cache.is_cache_valid(Some(Duration::from_millis(500))));
    assert!(cache.get_last_sync().await.is_some());
  }

  #[tokio::test]
  async fn test_clear_cache() {
    let cache = CacheValidity::new(Arc::new(MemoryKeyValue::default()));
    cache.update_last_sync().await;

    assert!(cache.clear_cache().await);
    assert!(!cache.is_cache_valid(None));
    assert!(cache.last_sync_cached().is_none());
    assert!(cache.get_last_sync().await.is_none());
  }

  #[tokio::test]
  async fn test_persist_failure_leaves_mirror() {
    let cache = CacheValidity::new(Arc::new(FailingKeyValue));

    assert!(!cache.update_last_sync().await);
    assert!(!cache.is_cache_valid(None));
    assert!(cache.get_last_sync().await.is_none());
    assert!(!cache.clear_cache().await);
  }

  #[tokio::test]
  async fn test_read_failure_reports_mirror() {
    let kv = Arc::new(MemoryKeyValue::default());
    let cache = CacheValidity::new(kv.clone());
    assert!(cache.update_last_sync().await);
    let recorded = cache.last_sync_cached();

    kv.fail_reads();
    assert_eq!(cache.get_last_sync().await, recorded);
    assert!(recorded.is_some());
    assert!(cache.is_cache_valid(None));
  }

  #[tokio::test]
  async fn test_garbage_value_is_treated_as_absent() {
    let kv = MemoryKeyValue::default();
    kv.set(LAST_SYNC_KEY, "not-a-number").await.unwrap();
    let cache = CacheValidity::new(Arc::new(kv));

    assert!(cache.get_last_sync().await.is_none());
    assert!(!cache.is_cache_valid(None));
  }

  #[tokio::test]
  async fn test_configured_ttl() {
    let kv = MemoryKeyValue::default();
    kv.set(
      LAST_SYNC_KEY,
      &(Utc::now().timestamp_millis() - 6 * MINUTE).to_string(),
    )
    .await
    .unwrap();
    let cache = CacheValidity::new(Arc::new(kv)).with_ttl(Duration::from_secs(3600));
    cache.initialize().await;

    assert!(cache.is_cache_valid(None));
    assert!(!cache.is_cache_valid(Some(DEFAULT_TTL)));
  }
}
