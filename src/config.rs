use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::query::CacheSettings;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Env var overriding `api.base_url`.
pub const BASE_URL_ENV: &str = "SCHOOL_PORTAL_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub session: SessionConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      request_timeout_secs: default_request_timeout(),
    }
  }
}

impl ApiConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a successful result counts as fresh
  #[serde(default = "default_stale_time")]
  pub stale_time_secs: u64,
  /// Seconds an unobserved entry survives garbage collection
  #[serde(default = "default_gc_time")]
  pub gc_time_secs: u64,
  /// Retries for network/5xx failures (0 = fail fast)
  #[serde(default)]
  pub retry: u32,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time(),
      gc_time_secs: default_gc_time(),
      retry: 0,
    }
  }
}

impl CacheConfig {
  pub fn settings(&self) -> CacheSettings {
    CacheSettings {
      stale_time: Duration::from_secs(self.stale_time_secs),
      gc_time: Duration::from_secs(self.gc_time_secs),
      retry: self.retry,
      ..CacheSettings::default()
    }
  }
}

fn default_stale_time() -> u64 {
  60
}

fn default_gc_time() -> u64 {
  300
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
  /// Tokens live only as long as the process
  #[default]
  Memory,
  /// Tokens persist in a SQLite file
  Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
  #[serde(default = "default_login_path")]
  pub login_path: String,
  #[serde(default)]
  pub token_store: TokenStoreKind,
  /// SQLite file for `token_store: sqlite` (defaults to the data dir)
  pub token_db: Option<PathBuf>,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      login_path: default_login_path(),
      token_store: TokenStoreKind::default(),
      token_db: None,
    }
  }
}

fn default_login_path() -> String {
  "/login".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write daily-rolling log files here instead of stderr
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./school-portal.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/school-portal/config.yaml
  ///
  /// `SCHOOL_PORTAL_API_URL` overrides the base URL in every case.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.apply_env();
    Ok(config)
  }

  /// Defaults plus environment overrides, without looking for a file.
  pub fn from_env() -> Self {
    let mut config = Self::default();
    config.apply_env();
    config
  }

  fn apply_env(&mut self) {
    if let Ok(url) = std::env::var(BASE_URL_ENV) {
      if !url.trim().is_empty() {
        self.api.base_url = url.trim().to_string();
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("school-portal.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("school-portal").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("api.base_url '{}' is not a valid URL: {}", self.api.base_url, e))?;
    if !self.session.login_path.starts_with('/') {
      return Err(eyre!(
        "session.login_path must start with '/', got '{}'",
        self.session.login_path
      ));
    }
    Ok(())
  }
}
