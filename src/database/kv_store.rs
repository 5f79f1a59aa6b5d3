//! Key-value persistence used for history stacks, settings and the custom instruction.
//!
//! Values are arbitrary JSON. [`SqliteStore`] is the durable implementation;
//! [`MemoryStore`] backs tests and throwaway sessions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::connection::Database;
use crate::types::errors::StorageError;

/// Trait defining the key-value persistence interface.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Writes every entry; implementations apply the batch atomically.
    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }
}

/// SQLite-backed store.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let db = self
            .db
            .lock()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        let raw: Option<String> = db
            .connection()
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::SerializationError(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        let mut db = self
            .db
            .lock()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        let now = Self::now();
        let tx = db.connection_mut().transaction()?;
        for (key, value) in entries {
            let text = serde_json::to_string(value)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            tx.execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, text, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-memory store. Writes can be made to fail to exercise degraded persistence.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    fn writes_fail(&self) -> bool {
        self.fail_writes.lock().map(|flag| *flag).unwrap_or(false)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        if self.writes_fail() {
            return Err(StorageError::DatabaseError("writes disabled".to_string()));
        }
        let mut values = self
            .values
            .lock()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
