//! Serialized store trait and its SQLite, in-memory and no-op backends.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, types::ValueRef, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// A value held under one key of the flat store namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
  /// Serialized payload bytes
  Data(Vec<u8>),
  /// Seconds since the Unix epoch
  Timestamp(f64),
}

impl StoreValue {
  pub fn as_timestamp(&self) -> Option<f64> {
    match self {
      Self::Timestamp(secs) => Some(*secs),
      Self::Data(_) => None,
    }
  }
}

/// Trait for key-value persistence backends.
///
/// The namespace is flat: callers decide how keys relate to each other.
/// `set_all` and `remove_all` must apply every entry or none of them.
pub trait SerializedStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<StoreValue>>;

  /// Write several entries as one unit.
  fn set_all(&self, entries: &[(String, StoreValue)]) -> Result<()>;

  /// Remove several keys as one unit. Missing keys are ignored.
  fn remove_all(&self, keys: &[String]) -> Result<()>;

  /// Every key currently present.
  fn keys(&self) -> Result<Vec<String>>;
}

/// Storage implementation that doesn't persist anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl SerializedStore for NoopStore {
  fn get(&self, _key: &str) -> Result<Option<StoreValue>> {
    Ok(None) // Always miss
  }

  fn set_all(&self, _entries: &[(String, StoreValue)]) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove_all(&self, _keys: &[String]) -> Result<()> {
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

/// Process-local store, lost on exit.
#[derive(Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, StoreValue>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SerializedStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<StoreValue>> {
    let entries = self
      .entries
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn set_all(&self, new_entries: &[(String, StoreValue)]) -> Result<()> {
    let mut entries = self
      .entries
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    for (key, value) in new_entries {
      entries.insert(key.clone(), value.clone());
    }
    Ok(())
  }

  fn remove_all(&self, keys: &[String]) -> Result<()> {
    let mut entries = self
      .entries
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    for key in keys {
      entries.remove(key);
    }
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let entries = self
      .entries
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.keys().cloned().collect())
  }
}

/// SQLite-based store that survives process restarts.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the store at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("pokedex").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the flat key-value table. `value` has no declared type so
/// payload BLOBs and REAL timestamps keep their storage class.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value NOT NULL
);
"#;

impl SerializedStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<StoreValue>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare_cached("SELECT value FROM kv_store WHERE key = ?")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    stmt
      .query_row(params![key], |row| {
        Ok(match row.get_ref(0)? {
          ValueRef::Real(secs) => Some(StoreValue::Timestamp(secs)),
          ValueRef::Integer(secs) => Some(StoreValue::Timestamp(secs as f64)),
          ValueRef::Blob(bytes) => Some(StoreValue::Data(bytes.to_vec())),
          ValueRef::Text(text) => Some(StoreValue::Data(text.to_vec())),
          ValueRef::Null => None,
        })
      })
      .optional()
      .map(Option::flatten)
      .map_err(|e| eyre!("Failed to read key {}: {}", key, e))
  }

  fn set_all(&self, entries: &[(String, StoreValue)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (key, value) in entries {
      let result = match value {
        StoreValue::Data(bytes) => tx.execute(
          "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
          params![key, bytes],
        ),
        StoreValue::Timestamp(secs) => tx.execute(
          "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
          params![key, secs],
        ),
      };
      result.map_err(|e| eyre!("Failed to store key {}: {}", key, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn remove_all(&self, keys: &[String]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for key in keys {
      tx.execute("DELETE FROM kv_store WHERE key = ?", params![key])
        .map_err(|e| eyre!("Failed to remove key {}: {}", key, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT key FROM kv_store")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list keys: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read key: {}", e))?;

    Ok(keys)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn entries() -> Vec<(String, StoreValue)> {
    vec![
      ("pikachu".to_string(), StoreValue::Data(b"{\"id\":25}".to_vec())),
      ("cache_time_pikachu".to_string(), StoreValue::Timestamp(1_700_000_000.5)),
    ]
  }

  #[test]
  fn test_sqlite_store_keeps_storage_class_per_value() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteStore::open_at(&dir.path().join("cache.db")).expect("open");

    store.set_all(&entries()).expect("write");

    assert_eq!(
      store.get("pikachu").expect("read"),
      Some(StoreValue::Data(b"{\"id\":25}".to_vec()))
    );
    assert_eq!(
      store.get("cache_time_pikachu").expect("read"),
      Some(StoreValue::Timestamp(1_700_000_000.5))
    );
    assert_eq!(store.get("missing").expect("read"), None);
  }

  #[test]
  fn test_sqlite_store_survives_reopen() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("nested").join("cache.db");

    {
      let store = SqliteStore::open_at(&path).expect("open");
      store.set_all(&entries()).expect("write");
    }

    let reopened = SqliteStore::open_at(&path).expect("reopen");
    let mut keys = reopened.keys().expect("keys");
    keys.sort();
    assert_eq!(keys, vec!["cache_time_pikachu", "pikachu"]);
  }

  #[test]
  fn test_sqlite_remove_all_ignores_missing_keys() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteStore::open_at(&dir.path().join("cache.db")).expect("open");
    store.set_all(&entries()).expect("write");

    store
      .remove_all(&["pikachu".to_string(), "cache_time_pikachu".to_string(), "nope".to_string()])
      .expect("remove");

    assert!(store.keys().expect("keys").is_empty());
  }

  #[test]
  fn test_memory_store_overwrites_existing_entry() {
    let store = MemoryStore::new();
    store.set_all(&entries()).expect("write");
    store
      .set_all(&[("pikachu".to_string(), StoreValue::Data(b"2".to_vec()))])
      .expect("overwrite");

    assert_eq!(
      store.get("pikachu").expect("read"),
      Some(StoreValue::Data(b"2".to_vec()))
    );
    assert_eq!(store.keys().expect("keys").len(), 2);
  }

  #[test]
  fn test_noop_store_always_misses() {
    let store = NoopStore;
    store.set_all(&entries()).expect("write");
    assert_eq!(store.get("pikachu").expect("read"), None);
    assert!(store.keys().expect("keys").is_empty());
  }
}
