//! Durable key-value store boundary.
//!
//! Each component persists one logical record (a serialized mapping) under a
//! distinct namespaced key. Every write replaces the whole value, so a crash
//! mid-write leaves the previous blob intact.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PersistenceError;

/// Namespaced keys, one per persisted component record.
pub mod keys {
    pub const PROGRESS: &str = "vocab-engine:progress";
    pub const DIFFICULTY: &str = "vocab-engine:difficulty";
    pub const ACHIEVEMENTS: &str = "vocab-engine:achievements";
    pub const SESSIONS: &str = "vocab-engine:sessions";
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory store. Default backing for tests and for callers that bring
/// their own persistence later.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| PersistenceError::Read(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
