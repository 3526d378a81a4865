//! Credential storage.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Where the access/refresh token pair lives between requests.
pub trait TokenStore: Send + Sync {
  fn access_token(&self) -> Result<Option<String>>;

  fn refresh_token(&self) -> Result<Option<String>>;

  /// Store a fresh pair after login/registration.
  fn set_tokens(&self, access: &str, refresh: &str) -> Result<()>;

  /// Replace only the access token (after a refresh).
  fn set_access_token(&self, access: &str) -> Result<()>;

  fn clear(&self) -> Result<()>;

  fn has_token(&self) -> bool {
    matches!(self.access_token(), Ok(Some(_)))
  }
}

#[derive(Debug, Default, Clone)]
struct TokenPair {
  access: Option<String>,
  refresh: Option<String>,
}

/// Process-local token store. Tokens are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
  tokens: RwLock<TokenPair>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_tokens(access: &str, refresh: &str) -> Self {
    Self {
      tokens: RwLock::new(TokenPair {
        access: Some(access.to_string()),
        refresh: Some(refresh.to_string()),
      }),
    }
  }
}

impl TokenStore for MemoryTokenStore {
  fn access_token(&self) -> Result<Option<String>> {
    let tokens = self
      .tokens
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(tokens.access.clone())
  }

  fn refresh_token(&self) -> Result<Option<String>> {
    let tokens = self
      .tokens
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(tokens.refresh.clone())
  }

  fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
    let mut tokens = self
      .tokens
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    tokens.access = Some(access.to_string());
    tokens.refresh = Some(refresh.to_string());
    Ok(())
  }

  fn set_access_token(&self, access: &str) -> Result<()> {
    let mut tokens = self
      .tokens
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    tokens.access = Some(access.to_string());
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut tokens = self
      .tokens
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *tokens = TokenPair::default();
    Ok(())
  }
}

/// SQLite-backed token store, so a session survives restarts.
pub struct SqliteTokenStore {
  conn: Mutex<Connection>,
}

impl SqliteTokenStore {
  /// Open (or create) the store at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open session database at {}: {}", path.display(), e))?;
    Self::from_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory session database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SESSION_SCHEMA)
      .map_err(|e| eyre!("Failed to run session migrations: {}", e))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("school-portal").join("session.db"))
  }

  fn read(&self, name: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM session_tokens WHERE name = ?1",
        params![name],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {} token: {}", name, e))
  }

  fn write(&self, entries: &[(&str, &str)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to start transaction: {}", e))?;
    let now = Utc::now().to_rfc3339();
    for (name, value) in entries {
      tx.execute(
        "INSERT INTO session_tokens (name, value, stored_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value, stored_at = excluded.stored_at",
        params![name, value, now],
      )
      .map_err(|e| eyre!("Failed to store {} token: {}", name, e))?;
    }
    tx.commit()
      .map_err(|e| eyre!("Failed to commit tokens: {}", e))?;
    Ok(())
  }
}

impl TokenStore for SqliteTokenStore {
  fn access_token(&self) -> Result<Option<String>> {
    self.read(ACCESS)
  }

  fn refresh_token(&self) -> Result<Option<String>> {
    self.read(REFRESH)
  }

  fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
    self.write(&[(ACCESS, access), (REFRESH, refresh)])
  }

  fn set_access_token(&self, access: &str) -> Result<()> {
    self.write(&[(ACCESS, access)])
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn
      .execute("DELETE FROM session_tokens", [])
      .map_err(|e| eyre!("Failed to clear tokens: {}", e))?;
    Ok(())
  }
}

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_tokens (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL
);
"#;
