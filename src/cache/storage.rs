//! Key-value storage: SQLite implementation and an in-memory one.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::KeyValueStore;

/// Storage implementation that keeps everything in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
  values: Mutex<std::collections::HashMap<String, Value>>,
}

#[cfg(test)]
impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<Value>> {
    let values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(values.get(key).cloned())
  }

  fn set(&self, key: &str, value: &Value) -> Result<()> {
    let mut values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    values.insert(key.to_string(), value.clone());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    values.remove(key);
    Ok(())
  }
}

/// SQLite-based key-value storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a store that lives only as long as this value.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory store: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    Ok(crate::config::data_dir()?.join("store.db"))
  }

  /// Run database migrations for the store table.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(())
  }

  /// When the value under `key` was last written.
  #[cfg(test)]
  pub fn updated_at(&self, key: &str) -> Result<Option<chrono::DateTime<Utc>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let stamp: Option<String> = conn
      .query_row(
        "SELECT updated_at FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read timestamp for {}: {}", key, e))?;

    stamp
      .map(|s| {
        chrono::DateTime::parse_from_rfc3339(&s)
          .map(|d| d.with_timezone(&Utc))
          .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
      })
      .transpose()
  }
}

/// Schema for the store table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<Value>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let raw: Option<String> = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))?;

    raw
      .map(|s| serde_json::from_str(&s).map_err(|e| eyre!("Failed to decode {}: {}", key, e)))
      .transpose()
  }

  fn set(&self, key: &str, value: &Value) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let data = serde_json::to_string(value).map_err(|e| eyre!("Failed to encode {}: {}", key, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
        params![key, data, Utc::now().to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_sqlite_round_trip_and_overwrite() {
    let store = SqliteStore::open_in_memory().unwrap();

    assert_eq!(store.get("FAVORITES").unwrap(), None);

    store.set("FAVORITES", &json!(["a"])).unwrap();
    store.set("FAVORITES", &json!(["a", "b"])).unwrap();
    assert_eq!(store.get("FAVORITES").unwrap(), Some(json!(["a", "b"])));
    assert!(store.updated_at("FAVORITES").unwrap().is_some());

    store.remove("FAVORITES").unwrap();
    store.remove("FAVORITES").unwrap();
    assert_eq!(store.get("FAVORITES").unwrap(), None);
  }

  #[test]
  fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.db");

    {
      let store = SqliteStore::open_at(&path).unwrap();
      store.set("FAVORITES", &json!(["x"])).unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    assert_eq!(store.get("FAVORITES").unwrap(), Some(json!(["x"])));
  }

  #[test]
  fn test_corrupt_row_is_an_error_not_a_panic() {
    let store = SqliteStore::open_in_memory().unwrap();
    {
      let conn = store.conn.lock().unwrap();
      conn
        .execute(
          "INSERT INTO kv_store (key, value, updated_at) VALUES ('FAVORITES', '{not json', '')",
          [],
        )
        .unwrap();
    }

    assert!(store.get("FAVORITES").is_err());
  }

  #[test]
  fn test_memory_store() {
    let store = MemoryStore::new();
    store.set("k", &json!(1)).unwrap();
    assert_eq!(store.get("k").unwrap(), Some(json!(1)));
    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
  }
}
