//! Test doubles for the remote and key-value seams.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::KeyValueStore;
use crate::remote::{Direction, RemoteSource};

/// A remote row in the wire shape.
pub fn remote_row(id: &str, title: &str, published_at: &str) -> Value {
  json!({
    "id": id,
    "title": title,
    "content": format!("{} body", title),
    "author": "Remote Author",
    "author_email": "remote@example.com",
    "published_at": published_at,
    "excerpt": null,
    "cover_image": null,
    "created_at": "2024-01-01T00:00:00+00:00",
    "updated_at": "2024-01-01T00:00:00+00:00"
  })
}

/// Scriptable in-memory remote.
pub struct MockRemote {
  configured: AtomicBool,
  rows: Mutex<std::result::Result<Vec<Value>, String>>,
  upsert_error: Option<String>,
  upserts: Mutex<Vec<(String, Vec<Value>)>>,
  select_calls: AtomicUsize,
  delay: Duration,
  panic_next: AtomicBool,
}

impl MockRemote {
  fn build(configured: bool, rows: std::result::Result<Vec<Value>, String>) -> Self {
    Self {
      configured: AtomicBool::new(configured),
      rows: Mutex::new(rows),
      upsert_error: None,
      upserts: Mutex::new(Vec::new()),
      select_calls: AtomicUsize::new(0),
      delay: Duration::ZERO,
      panic_next: AtomicBool::new(false),
    }
  }

  pub fn unconfigured() -> Self {
    Self::build(false, Ok(Vec::new()))
  }

  pub fn with_rows(rows: Vec<Value>) -> Self {
    Self::build(true, Ok(rows))
  }

  pub fn failing(message: &str) -> Self {
    Self::build(true, Err(message.to_string()))
  }

  /// Wait this long inside every select.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  pub fn failing_upserts(mut self, message: &str) -> Self {
    self.upsert_error = Some(message.to_string());
    self
  }

  /// Mark as configured and serve `rows` from now on.
  pub fn configure(&self, rows: Vec<Value>) {
    self.configured.store(true, Ordering::SeqCst);
    *self.rows.lock().unwrap() = Ok(rows);
  }

  pub fn fail_with(&self, message: &str) {
    *self.rows.lock().unwrap() = Err(message.to_string());
  }

  /// Panic inside the next select only.
  pub fn panic_on_next_select(&self) {
    self.panic_next.store(true, Ordering::SeqCst);
  }

  pub fn select_calls(&self) -> usize {
    self.select_calls.load(Ordering::SeqCst)
  }

  pub fn last_upsert(&self) -> Option<(String, Vec<Value>)> {
    self.upserts.lock().unwrap().last().cloned()
  }
}

#[async_trait]
impl RemoteSource for MockRemote {
  fn is_configured(&self) -> bool {
    self.configured.load(Ordering::SeqCst)
  }

  async fn select_ordered(
    &self,
    _table: &str,
    _order_by: &str,
    _direction: Direction,
  ) -> Result<Vec<Value>> {
    self.select_calls.fetch_add(1, Ordering::SeqCst);
    if self.panic_next.swap(false, Ordering::SeqCst) {
      panic!("remote blew up");
    }
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    let rows = self.rows.lock().unwrap().clone();
    rows.map_err(|e| eyre!("{}", e))
  }

  async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
    if let Some(e) = &self.upsert_error {
      return Err(eyre!("{}", e));
    }
    self
      .upserts
      .lock()
      .unwrap()
      .push((table.to_string(), rows));
    Ok(())
  }
}

/// Key-value store kept in a map, counting writes.
#[derive(Default)]
pub struct MemoryKeyValue {
  values: Mutex<HashMap<String, String>>,
  sets: AtomicUsize,
  reads_fail: AtomicBool,
}

impl MemoryKeyValue {
  pub fn set_calls(&self) -> usize {
    self.sets.load(Ordering::SeqCst)
  }

  /// Make every later `get` fail.
  pub fn fail_reads(&self) {
    self.reads_fail.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValue {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    if self.reads_fail.load(Ordering::SeqCst) {
      return Err(eyre!("read failed"));
    }
    Ok(self.values.lock().unwrap().get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    self.sets.fetch_add(1, Ordering::SeqCst);
    self
      .values
      .lock()
      .unwrap()
      .insert(key.to_string(), value.to_string());
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    self.values.lock().unwrap().remove(key);
    Ok(())
  }
}

/// Key-value store whose every call fails.
pub struct FailingKeyValue;

#[async_trait]
impl KeyValueStore for FailingKeyValue {
  async fn get(&self, _key: &str) -> Result<Option<String>> {
    Err(eyre!("storage unavailable"))
  }

  async fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Err(eyre!("storage unavailable"))
  }

  async fn delete(&self, _key: &str) -> Result<()> {
    Err(eyre!("storage unavailable"))
  }
}
