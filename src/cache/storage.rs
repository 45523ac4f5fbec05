//! Durable key-value storage trait and SQLite implementation.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::Database;

/// Trait for durable key-value backends.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Read a value, `None` if the key was never written or was deleted.
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Write a value, replacing any previous one.
  async fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove a value. Removing a missing key is not an error.
  async fn delete(&self, key: &str) -> Result<()>;
}

/// Key-value storage in the `kv_store` table of the app database.
///
/// Calls run synchronously on the shared connection and never suspend; the
/// async signature only satisfies [`KeyValueStore`].
pub struct SqliteKeyValue {
  db: Database,
}

impl SqliteKeyValue {
  pub fn new(db: Database) -> Self {
    Self { db }
  }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValue {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.db.lock()?;
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.db.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", key, e))?;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    let conn = self.db.lock()?;
    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to delete {}: {}", key, e))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_set_get_delete() {
    let kv = SqliteKeyValue::new(Database::open_in_memory().unwrap());

    assert_eq!(kv.get("k").await.unwrap(), None);

    kv.set("k", "1").await.unwrap();
    kv.set("k", "2").await.unwrap();
    assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("2"));

    kv.delete("k").await.unwrap();
    kv.delete("k").await.unwrap();
    assert_eq!(kv.get("k").await.unwrap(), None);
  }
}
