//! Pull/push synchronization between the local store and the remote.

use chrono::Utc;
use color_eyre::Result;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::mock_data::mock_blogs;
use crate::db::{BlogRecord, BlogStore, NewBlog};
use crate::remote::{Direction, RemoteBlogRow, RemoteSource};

pub const BLOGS_TABLE: &str = "blogs";
const ORDER_COLUMN: &str = "published_at";

/// Result of seeding the built-in posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
  /// The store was empty and this many posts were created
  Seeded(usize),
  /// The store already held this many records; nothing was written
  AlreadyPopulated(usize),
  Failed(String),
}

/// Why a pull fell back to seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
  NotConfigured,
  RemoteError(String),
  EmptyRemote,
  /// Rows arrived but could not be applied locally
  ReconcileError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
  Reconciled { created: usize, updated: usize },
  Fallback {
    reason: FallbackReason,
    seed: SeedOutcome,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
  Pushed(usize),
  NotConfigured,
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
  Completed(PullOutcome),
  /// Another sync was in progress; this call did nothing
  AlreadyRunning,
}

impl SyncReport {
  pub fn is_completed(&self) -> bool {
    matches!(self, SyncReport::Completed(_))
  }
}

impl fmt::Display for SeedOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SeedOutcome::Seeded(n) => write!(f, "seeded {} built-in posts", n),
      SeedOutcome::AlreadyPopulated(n) => write!(f, "kept {} local posts", n),
      SeedOutcome::Failed(e) => write!(f, "seeding failed: {}", e),
    }
  }
}

impl fmt::Display for FallbackReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FallbackReason::NotConfigured => write!(f, "remote not configured"),
      FallbackReason::RemoteError(e) => write!(f, "remote error: {}", e),
      FallbackReason::EmptyRemote => write!(f, "remote has no posts"),
      FallbackReason::ReconcileError(e) => write!(f, "could not apply remote posts: {}", e),
    }
  }
}

impl fmt::Display for PullOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PullOutcome::Reconciled { created, updated } => {
        write!(f, "pulled from remote: {} created, {} updated", created, updated)
      }
      PullOutcome::Fallback { reason, seed } => write!(f, "{}; {}", reason, seed),
    }
  }
}

impl fmt::Display for PushOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PushOutcome::Pushed(n) => write!(f, "pushed {} posts", n),
      PushOutcome::NotConfigured => write!(f, "remote not configured, nothing pushed"),
      PushOutcome::Failed(e) => write!(f, "push failed: {}", e),
    }
  }
}

impl fmt::Display for SyncReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SyncReport::Completed(pull) => pull.fmt(f),
      SyncReport::AlreadyRunning => write!(f, "sync already in progress"),
    }
  }
}

/// Clears the in-flight flag when a sync finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(flag))
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// Copy remote fields onto a local record. Remote always wins.
fn apply_remote(record: &mut BlogRecord, incoming: &NewBlog) {
  record.title = incoming.title.clone();
  record.content = incoming.content.clone();
  record.author = incoming.author.clone();
  record.author_email = incoming.author_email.clone();
  record.published_at = incoming.published_at;
  record.excerpt = incoming.excerpt.clone();
  record.cover_image = incoming.cover_image.clone();
}

/// One-shot sync operations.
///
/// None of these return errors: every failure is logged where it happens and
/// reported in the returned outcome, so a broken network or store never stops
/// the app from showing whatever data it has.
pub struct SyncEngine {
  store: BlogStore,
  remote: Arc<dyn RemoteSource>,
  single_flight: bool,
  in_flight: AtomicBool,
}

impl SyncEngine {
  pub fn new(store: BlogStore, remote: Arc<dyn RemoteSource>) -> Self {
    Self {
      store,
      remote,
      single_flight: true,
      in_flight: AtomicBool::new(false),
    }
  }

  /// Allow or collapse overlapping `full_sync` calls.
  pub fn with_single_flight(mut self, enabled: bool) -> Self {
    self.single_flight = enabled;
    self
  }

  #[cfg(test)]
  pub fn store(&self) -> &BlogStore {
    &self.store
  }

  /// Pull only. Push is deliberately left out: the remote is authoritative.
  pub async fn full_sync(&self) -> SyncReport {
    let _guard = if self.single_flight {
      match InFlight::acquire(&self.in_flight) {
        Some(guard) => Some(guard),
        None => {
          info!("Sync already in progress, skipping");
          return SyncReport::AlreadyRunning;
        }
      }
    } else {
      None
    };

    SyncReport::Completed(self.pull_from_remote().await)
  }

  /// Replace local posts with the remote ones, matching on id.
  ///
  /// Falls back to the built-in posts when the remote is unusable or empty.
  pub async fn pull_from_remote(&self) -> PullOutcome {
    if !self.remote.is_configured() {
      info!("Remote not configured, using built-in posts");
      return self.fall_back(FallbackReason::NotConfigured).await;
    }

    let rows = match self
      .remote
      .select_ordered(BLOGS_TABLE, ORDER_COLUMN, Direction::Descending)
      .await
    {
      Ok(rows) => rows,
      Err(e) => {
        warn!("Failed to fetch blogs from remote: {}", e);
        return self
          .fall_back(FallbackReason::RemoteError(e.to_string()))
          .await;
      }
    };

    if rows.is_empty() {
      info!("No blogs on remote, using built-in posts");
      return self.fall_back(FallbackReason::EmptyRemote).await;
    }

    match self.reconcile(rows) {
      Ok((created, updated)) => {
        info!(created, updated, "Pulled blogs from remote");
        PullOutcome::Reconciled { created, updated }
      }
      Err(e) => {
        error!("Failed to apply remote blogs: {}", e);
        self
          .fall_back(FallbackReason::ReconcileError(e.to_string()))
          .await
      }
    }
  }

  fn reconcile(&self, rows: Vec<Value>) -> Result<(usize, usize)> {
    let incoming = rows
      .into_iter()
      .map(|value| RemoteBlogRow::from_value(value)?.to_new_blog())
      .collect::<Result<Vec<_>>>()?;

    self.store.write(|txn| {
      let mut known: HashSet<String> = txn.query_all()?.into_iter().map(|r| r.id).collect();
      let (mut created, mut updated) = (0, 0);

      for blog in incoming {
        if known.contains(&blog.id) {
          txn.update(&blog.id, |record| apply_remote(record, &blog))?;
          updated += 1;
        } else {
          known.insert(blog.id.clone());
          txn.create(blog)?;
          created += 1;
        }
      }

      Ok((created, updated))
    })
  }

  async fn fall_back(&self, reason: FallbackReason) -> PullOutcome {
    let seed = self.seed_mock_data().await;
    PullOutcome::Fallback { reason, seed }
  }

  /// Fill an empty store with the built-in posts. Never touches a store that
  /// already has records.
  pub async fn seed_mock_data(&self) -> SeedOutcome {
    let result = self.store.write(|txn| {
      let existing = txn.query_all()?.len();
      if existing > 0 {
        return Ok(SeedOutcome::AlreadyPopulated(existing));
      }

      let blogs = mock_blogs(Utc::now().timestamp_millis());
      let count = blogs.len();
      for blog in blogs {
        txn.create(blog)?;
      }
      Ok(SeedOutcome::Seeded(count))
    });

    match result {
      Ok(outcome) => {
        match &outcome {
          SeedOutcome::Seeded(n) => info!("Seeded {} built-in posts", n),
          _ => info!("Local store already has posts, skipping seed"),
        }
        outcome
      }
      Err(e) => {
        error!("Failed to seed built-in posts: {}", e);
        SeedOutcome::Failed(e.to_string())
      }
    }
  }

  /// Upsert every local post to the remote, keyed by id.
  pub async fn push_to_remote(&self) -> PushOutcome {
    if !self.remote.is_configured() {
      info!("Remote not configured, skipping push");
      return PushOutcome::NotConfigured;
    }

    let rows = match self.local_rows() {
      Ok(rows) => rows,
      Err(e) => {
        error!("Failed to read local blogs for push: {}", e);
        return PushOutcome::Failed(e.to_string());
      }
    };

    if rows.is_empty() {
      return PushOutcome::Pushed(0);
    }

    let count = rows.len();
    match self.remote.upsert(BLOGS_TABLE, rows).await {
      Ok(()) => {
        info!("Pushed {} blogs to remote", count);
        PushOutcome::Pushed(count)
      }
      Err(e) => {
        warn!("Failed to push blogs to remote: {}", e);
        PushOutcome::Failed(e.to_string())
      }
    }
  }

  fn local_rows(&self) -> Result<Vec<Value>> {
    self
      .store
      .query_all()?
      .iter()
      .map(|record| RemoteBlogRow::from_record(record)?.into_value())
      .collect()
  }
}
