use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  /// SQLite file for local records (defaults to the XDG data directory)
  pub database_path: Option<PathBuf>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
  /// Supabase project URL, e.g. https://xyz.supabase.co
  pub url: Option<String>,
  /// Supabase anon key
  pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// How long a successful sync keeps the cache valid
  pub cache_ttl_secs: u64,
  /// Period of the background sync loop
  pub interval_secs: u64,
  /// Freshness floor checked by the background loop before syncing
  pub min_cache_ttl_secs: u64,
  /// Collapse overlapping sync calls into one
  pub single_flight: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      cache_ttl_secs: 5 * 60,
      interval_secs: 10 * 60,
      min_cache_ttl_secs: 5 * 60,
      single_flight: true,
    }
  }
}

impl SyncConfig {
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_secs)
  }

  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs)
  }

  pub fn min_cache_ttl(&self) -> Duration {
    Duration::from_secs(self.min_cache_ttl_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// tracing filter directive, overridden by RUST_LOG
  pub filter: String,
  /// Directory for rolling log files (defaults to the XDG data directory)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      filter: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./blogsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/blogsync/config.yaml
  ///
  /// Without any file the defaults apply, which leaves the remote unconfigured.
  /// Remote credentials from the environment override the file.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    Ok(config.with_env_overrides())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("blogsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("blogsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Apply BLOGSYNC_SUPABASE_URL and BLOGSYNC_SUPABASE_ANON_KEY.
  fn with_env_overrides(mut self) -> Self {
    if let Ok(url) = std::env::var("BLOGSYNC_SUPABASE_URL") {
      self.remote.url = Some(url);
    }
    if let Ok(key) = std::env::var("BLOGSYNC_SUPABASE_ANON_KEY") {
      self.remote.anon_key = Some(key);
    }
    self
  }
}
