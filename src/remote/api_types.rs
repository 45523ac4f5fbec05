//! Serde types matching rows of the remote `blogs` table.
//!
//! These are kept apart from the local record type: the remote uses
//! snake_case column names and ISO-8601 timestamps, the local store uses
//! epoch milliseconds.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{BlogRecord, NewBlog};

/// A row of the remote `blogs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBlogRow {
  pub id: String,
  pub title: String,
  pub content: String,
  pub author: String,
  pub author_email: String,
  pub published_at: String,
  #[serde(default)]
  pub excerpt: Option<String>,
  #[serde(default)]
  pub cover_image: Option<String>,
  /// Server-managed, never sent on upsert
  #[serde(default, skip_serializing)]
  pub created_at: Option<String>,
  /// Server-managed, never sent on upsert
  #[serde(default, skip_serializing)]
  pub updated_at: Option<String>,
}

impl RemoteBlogRow {
  pub fn from_value(value: Value) -> Result<Self> {
    serde_json::from_value(value).map_err(|e| eyre!("Failed to parse blog row: {}", e))
  }

  pub fn into_value(self) -> Result<Value> {
    serde_json::to_value(self).map_err(|e| eyre!("Failed to serialize blog row: {}", e))
  }

  /// Translate into a local initializer, keeping the remote id.
  pub fn to_new_blog(&self) -> Result<NewBlog> {
    Ok(NewBlog {
      id: self.id.clone(),
      title: self.title.clone(),
      content: self.content.clone(),
      author: self.author.clone(),
      author_email: self.author_email.clone(),
      published_at: iso_to_millis(&self.published_at)?,
      excerpt: non_empty(&self.excerpt),
      cover_image: non_empty(&self.cover_image),
    })
  }

  pub fn from_record(record: &BlogRecord) -> Result<Self> {
    Ok(Self {
      id: record.id.clone(),
      title: record.title.clone(),
      content: record.content.clone(),
      author: record.author.clone(),
      author_email: record.author_email.clone(),
      published_at: millis_to_iso(record.published_at)?,
      excerpt: record.excerpt.clone(),
      cover_image: record.cover_image.clone(),
      created_at: None,
      updated_at: None,
    })
  }
}

/// Empty strings from the remote mean "no value" locally.
fn non_empty(value: &Option<String>) -> Option<String> {
  value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Parse an ISO-8601 timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 with any offset, and naive timestamps (no offset) which
/// are read as UTC.
pub fn iso_to_millis(s: &str) -> Result<i64> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.timestamp_millis());
  }

  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.and_utc().timestamp_millis())
    .ok_or_else(|| eyre!("Failed to parse timestamp '{}'", s))
}

/// Format epoch milliseconds as ISO-8601 UTC with millisecond precision.
pub fn millis_to_iso(ms: i64) -> Result<String> {
  DateTime::<Utc>::from_timestamp_millis(ms)
    .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    .ok_or_else(|| eyre!("Timestamp {} is out of range", ms))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_iso_to_millis_keeps_milliseconds() {
    assert_eq!(
      iso_to_millis("2024-03-01T12:30:45.123Z").unwrap(),
      1_709_296_245_123
    );
    assert_eq!(
      iso_to_millis("2024-03-01T14:30:45.123+02:00").unwrap(),
      1_709_296_245_123
    );
    assert_eq!(
      iso_to_millis("2024-03-01T12:30:45.123456+00:00").unwrap(),
      1_709_296_245_123
    );
  }

  #[test]
  fn test_iso_to_millis_naive_is_utc() {
    assert_eq!(
      iso_to_millis("2024-03-01T12:30:45.123").unwrap(),
      1_709_296_245_123
    );
    assert_eq!(
      iso_to_millis("2024-03-01 12:30:45").unwrap(),
      1_709_296_245_000
    );
  }

  #[test]
  fn test_iso_to_millis_rejects_garbage() {
    assert!(iso_to_millis("yesterday").is_err());
    assert!(iso_to_millis("").is_err());
  }

  #[test]
  fn test_millis_to_iso() {
    assert_eq!(
      millis_to_iso(1_709_296_245_123).unwrap(),
      "2024-03-01T12:30:45.123Z"
    );
    assert_eq!(millis_to_iso(0).unwrap(), "1970-01-01T00:00:00.000Z");
  }

  #[test]
  fn test_conversion_is_lossless_at_millisecond_precision() {
    for ms in [0, 1, 999, 1_709_296_245_123, 1_709_296_245_000] {
      assert_eq!(iso_to_millis(&millis_to_iso(ms).unwrap()).unwrap(), ms);
    }
  }

  #[test]
  fn test_row_from_remote_json() {
    let row = RemoteBlogRow::from_value(json!({
      "id": "abc",
      "title": "Hello",
      "content": "Body",
      "author": "Ana",
      "author_email": "ana@example.com",
      "published_at": "2024-03-01T12:30:45.123+00:00",
      "excerpt": null,
      "cover_image": "",
      "created_at": "2024-03-01T12:00:00+00:00",
      "updated_at": "2024-03-01T12:00:00+00:00"
    }))
    .unwrap();

    let new = row.to_new_blog().unwrap();
    assert_eq!(new.id, "abc");
    assert_eq!(new.author_email, "ana@example.com");
    assert_eq!(new.published_at, 1_709_296_245_123);
    assert_eq!(new.excerpt, None);
    assert_eq!(new.cover_image, None);
  }

  #[test]
  fn test_row_missing_required_field() {
    assert!(RemoteBlogRow::from_value(json!({ "id": "abc" })).is_err());
  }

  #[test]
  fn test_row_to_json_skips_server_columns() {
    let record = BlogRecord {
      id: "1".to_string(),
      title: "T".to_string(),
      content: "C".to_string(),
      author: "A".to_string(),
      author_email: "a@example.com".to_string(),
      published_at: 1_709_296_245_123,
      excerpt: Some("E".to_string()),
      cover_image: None,
      created_at: 1,
      updated_at: 2,
    };

    let value = RemoteBlogRow::from_record(&record)
      .unwrap()
      .into_value()
      .unwrap();

    assert_eq!(value["published_at"], "2024-03-01T12:30:45.123Z");
    assert_eq!(value["author_email"], "a@example.com");
    assert_eq!(value["cover_image"], Value::Null);
    assert!(value.get("created_at").is_none());
    assert!(value.get("updated_at").is_none());
  }
}
