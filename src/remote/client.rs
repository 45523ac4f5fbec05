use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::source::{Direction, RemoteSource};
use crate::config::RemoteConfig;

/// Defaults used by the app template when no backend is set up.
pub const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";
pub const PLACEHOLDER_KEY: &str = "placeholder-anon-key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a URL/key pair points at a real backend.
pub fn credentials_configured(url: Option<&str>, key: Option<&str>) -> bool {
  match (url, key) {
    (Some(url), Some(key)) => {
      let url = url.trim();
      let key = key.trim();
      !url.is_empty() && !key.is_empty() && url != PLACEHOLDER_URL && key != PLACEHOLDER_KEY
    }
    _ => false,
  }
}

/// Supabase REST (PostgREST) client
#[derive(Clone)]
pub struct PostgrestClient {
  http: reqwest::Client,
  /// `{url}/rest/v1/`, present only when the credentials are usable
  base: Option<Url>,
}

impl PostgrestClient {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    let unconfigured = Self {
      http: reqwest::Client::new(),
      base: None,
    };

    let (Some(url), Some(key)) = (config.url.as_deref(), config.anon_key.as_deref()) else {
      return Ok(unconfigured);
    };
    if !credentials_configured(Some(url), Some(key)) {
      return Ok(unconfigured);
    }
    let key = key.trim();

    let base = Url::parse(&format!("{}/rest/v1/", url.trim().trim_end_matches('/')))
      .map_err(|e| eyre!("Invalid remote URL {}: {}", url, e))?;

    let mut headers = HeaderMap::new();
    headers.insert(
      "apikey",
      HeaderValue::from_str(key).map_err(|e| eyre!("Invalid remote key: {}", e))?,
    );
    headers.insert(
      AUTHORIZATION,
      HeaderValue::from_str(&format!("Bearer {}", key))
        .map_err(|e| eyre!("Invalid remote key: {}", e))?,
    );

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base: Some(base),
    })
  }

  fn table_url(&self, table: &str) -> Result<Url> {
    let base = self
      .base
      .as_ref()
      .ok_or_else(|| eyre!("Remote is not configured"))?;
    base
      .join(table)
      .map_err(|e| eyre!("Invalid table name {}: {}", table, e))
  }
}

#[async_trait]
impl RemoteSource for PostgrestClient {
  fn is_configured(&self) -> bool {
    self.base.is_some()
  }

  async fn select_ordered(
    &self,
    table: &str,
    order_by: &str,
    direction: Direction,
  ) -> Result<Vec<Value>> {
    let mut url = self.table_url(table)?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("order", &format!("{}.{}", order_by, direction.as_str()));

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", table, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Failed to fetch {}: HTTP {} {}", table, status, body));
    }

    response
      .json::<Vec<Value>>()
      .await
      .map_err(|e| eyre!("Failed to parse {} rows: {}", table, e))
  }

  async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
    let url = self.table_url(table)?;

    let response = self
      .http
      .post(url)
      .header("Prefer", "resolution=merge-duplicates,return=minimal")
      .json(&rows)
      .send()
      .await
      .map_err(|e| eyre!("Failed to upsert {}: {}", table, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Failed to upsert {}: HTTP {} {}", table, status, body));
    }

    Ok(())
  }
}
