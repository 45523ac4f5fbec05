//! Local blog record collection backed by SQLite.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::Serialize;
use std::cell::Cell;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::observe::{RecordSubscription, Subscription};
use super::Database;

const SELECT_COLUMNS: &str = "SELECT id, title, content, author, author_email, published_at, \
   excerpt, cover_image, created_at, updated_at FROM blogs";

/// A blog post as stored locally. All timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogRecord {
  pub id: String,
  pub title: String,
  pub content: String,
  pub author: String,
  pub author_email: String,
  pub published_at: i64,
  pub excerpt: Option<String>,
  pub cover_image: Option<String>,
  /// Set once when the record is created locally
  pub created_at: i64,
  /// Bumped on every local mutation
  pub updated_at: i64,
}

/// Initializer for a new local record. The id is kept as the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlog {
  pub id: String,
  pub title: String,
  pub content: String,
  pub author: String,
  pub author_email: String,
  pub published_at: i64,
  pub excerpt: Option<String>,
  pub cover_image: Option<String>,
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<BlogRecord> {
  Ok(BlogRecord {
    id: row.get(0)?,
    title: row.get(1)?,
    content: row.get(2)?,
    author: row.get(3)?,
    author_email: row.get(4)?,
    published_at: row.get(5)?,
    excerpt: row.get(6)?,
    cover_image: row.get(7)?,
    created_at: row.get(8)?,
    updated_at: row.get(9)?,
  })
}

fn select_all(conn: &rusqlite::Connection, order: &str) -> Result<Vec<BlogRecord>> {
  let sql = format!("{} ORDER BY {}", SELECT_COLUMNS, order);
  let mut stmt = conn
    .prepare(&sql)
    .map_err(|e| eyre!("Failed to prepare blog query: {}", e))?;

  let records = stmt
    .query_map([], row_to_record)
    .map_err(|e| eyre!("Failed to query blogs: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read blog row: {}", e))?;

  Ok(records)
}

fn select_one(conn: &rusqlite::Connection, id: &str) -> Result<Option<BlogRecord>> {
  let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
  conn
    .query_row(&sql, params![id], row_to_record)
    .optional()
    .map_err(|e| eyre!("Failed to load blog {}: {}", id, e))
}

/// The local record collection.
///
/// Reads go straight to SQLite. Writes only happen inside [`BlogStore::write`],
/// which wraps them in one transaction and notifies subscribers after commit.
#[derive(Clone)]
pub struct BlogStore {
  db: Database,
  changes: Arc<watch::Sender<Arc<Vec<BlogRecord>>>>,
}

impl BlogStore {
  pub fn new(db: Database) -> Result<Self> {
    let initial = {
      let conn = db.lock()?;
      select_all(&conn, "rowid")?
    };
    let (tx, _rx) = watch::channel(Arc::new(initial));

    Ok(Self {
      db,
      changes: Arc::new(tx),
    })
  }

  /// All records in insertion order.
  pub fn query_all(&self) -> Result<Vec<BlogRecord>> {
    let conn = self.db.lock()?;
    select_all(&conn, "rowid")
  }

  /// All records, most recently published first.
  pub fn query_latest(&self) -> Result<Vec<BlogRecord>> {
    let conn = self.db.lock()?;
    select_all(&conn, "published_at DESC, rowid")
  }

  pub fn find(&self, id: &str) -> Result<Option<BlogRecord>> {
    let conn = self.db.lock()?;
    select_one(&conn, id)
  }

  pub fn count(&self) -> Result<usize> {
    let conn = self.db.lock()?;
    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM blogs", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count blogs: {}", e))?;
    Ok(count as usize)
  }

  /// Run `f` inside one write transaction.
  ///
  /// The transaction commits only if `f` returns `Ok`; any error rolls back
  /// every write made through the [`WriteTxn`]. Subscribers are notified only
  /// when the committed transaction created or updated a record.
  pub fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&WriteTxn<'_>) -> Result<T>,
  {
    let (value, dirty) = {
      let mut conn = self.db.lock()?;
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;
      let txn = WriteTxn {
        tx,
        dirty: Cell::new(false),
      };

      let value = f(&txn)?;

      let dirty = txn.dirty.get();
      txn
        .tx
        .commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
      (value, dirty)
    };

    if dirty {
      self.publish();
    }
    Ok(value)
  }

  /// Subscribe to the whole collection.
  pub fn observe(&self) -> Subscription {
    Subscription::new(self.changes.subscribe())
  }

  /// Subscribe to a single record by id.
  pub fn observe_record(&self, id: &str) -> RecordSubscription {
    RecordSubscription::new(self.observe(), id.to_string())
  }

  fn publish(&self) {
    match self.query_all() {
      Ok(records) => {
        self.changes.send_replace(Arc::new(records));
      }
      Err(e) => warn!("Failed to refresh blog subscribers: {}", e),
    }
  }
}

/// Handle for writes inside [`BlogStore::write`].
pub struct WriteTxn<'conn> {
  tx: Transaction<'conn>,
  dirty: Cell<bool>,
}

impl WriteTxn<'_> {
  pub fn query_all(&self) -> Result<Vec<BlogRecord>> {
    select_all(&self.tx, "rowid")
  }

  pub fn find(&self, id: &str) -> Result<Option<BlogRecord>> {
    select_one(&self.tx, id)
  }

  /// Insert a new record, stamping `created_at` and `updated_at` with now.
  pub fn create(&self, new: NewBlog) -> Result<BlogRecord> {
    let now = Utc::now().timestamp_millis();
    let record = BlogRecord {
      id: new.id,
      title: new.title,
      content: new.content,
      author: new.author,
      author_email: new.author_email,
      published_at: new.published_at,
      excerpt: new.excerpt,
      cover_image: new.cover_image,
      created_at: now,
      updated_at: now,
    };

    self
      .tx
      .execute(
        "INSERT INTO blogs (id, title, content, author, author_email, published_at, excerpt, cover_image, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
          record.id,
          record.title,
          record.content,
          record.author,
          record.author_email,
          record.published_at,
          record.excerpt,
          record.cover_image,
          record.created_at,
          record.updated_at,
        ],
      )
      .map_err(|e| eyre!("Failed to create blog {}: {}", record.id, e))?;

    self.dirty.set(true);
    Ok(record)
  }

  /// Apply `f` to an existing record and save it.
  ///
  /// `id` and `created_at` cannot be changed; `updated_at` is set to now.
  pub fn update<F>(&self, id: &str, f: F) -> Result<BlogRecord>
  where
    F: FnOnce(&mut BlogRecord),
  {
    let existing = self
      .find(id)?
      .ok_or_else(|| eyre!("Blog {} does not exist", id))?;

    let mut record = existing.clone();
    f(&mut record);
    record.id = existing.id;
    record.created_at = existing.created_at;
    record.updated_at = Utc::now().timestamp_millis();

    self
      .tx
      .execute(
        "UPDATE blogs SET title = ?, content = ?, author = ?, author_email = ?, published_at = ?,
           excerpt = ?, cover_image = ?, updated_at = ?
         WHERE id = ?",
        params![
          record.title,
          record.content,
          record.author,
          record.author_email,
          record.published_at,
          record.excerpt,
          record.cover_image,
          record.updated_at,
          record.id,
        ],
      )
      .map_err(|e| eyre!("Failed to update blog {}: {}", id, e))?;

    self.dirty.set(true);
    Ok(record)
  }
}
