//! In-memory storage backend
//!
//! State lives only as long as the process, so this backend is meant for tests
//! and for `--drain` runs that never need to resume.

use crate::storage::traits::{KeyValueStore, StorageError, StorageResult, StoredValue};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> StorageResult<MutexGuard<'_, HashMap<String, StoredValue>>> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let now = Utc::now();
        let mut entries = self.entries()?;
        let value = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());
        if value.is_none() {
            entries.remove(key);
        }
        Ok(value)
    }

    fn save(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()> {
        let entry = StoredValue::new(value, ttl, Utc::now());
        self.entries()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new_value: Option<&str>,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        let now = Utc::now();
        let mut entries = self.entries()?;

        let current = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.as_str());
        if current != expected {
            return Ok(false);
        }

        match new_value {
            Some(value) => {
                entries.insert(key.to_string(), StoredValue::new(value, ttl, now));
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(true)
    }
}
