//! Logging setup.

use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Env var consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "SCHOOL_PORTAL_LOG";

const LOG_FILE_PREFIX: &str = "school-portal.log";

/// Filter from `SCHOOL_PORTAL_LOG`, then `RUST_LOG`, then `default_level`
/// applied to this crate only.
pub fn env_filter(default_level: &str) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| {
      EnvFilter::new(format!(
        "{}={},hyper=warn,reqwest=warn,rusqlite=warn",
        env!("CARGO_CRATE_NAME"),
        default_level
      ))
    })
}

/// Install the global subscriber. With `logging.directory` set, output goes
/// to a daily-rolling file and the returned guard must be kept alive for the
/// writer to flush; otherwise logs go to stderr.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = env_filter(&config.level);

  match &config.directory {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      let file_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(filter);

      tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter);

      tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;
      Ok(None)
    }
  }
}

/// Short stable identifier for a token, safe to log.
pub fn token_fingerprint(token: &str) -> String {
  let digest = Sha256::digest(token.as_bytes());
  hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fingerprint_is_short_and_stable() {
    let a = token_fingerprint("eyJhbGciOiJIUzI1NiJ9.payload.sig");
    assert_eq!(a.len(), 12);
    assert_eq!(a, token_fingerprint("eyJhbGciOiJIUzI1NiJ9.payload.sig"));
    assert_ne!(a, token_fingerprint("other"));
    assert!(!a.contains("eyJ"));
  }

  #[test]
  fn test_file_logging_returns_guard() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
      level: "debug".into(),
      directory: Some(dir.path().join("logs")),
    };

    // Only one global subscriber per process; another test may have won.
    if let Ok(guard) = init_logging(&config) {
      assert!(guard.is_some());
      tracing::info!("written to file");
    }
    assert!(dir.path().join("logs").is_dir());
  }
}
