//! JSON file storage backend
//!
//! All entries live in one JSON document that is rewritten on every mutation.
//! Writes go to a sibling temp file first and are renamed into place, so a tick
//! killed mid-write leaves the previous document intact. Mutual exclusion only
//! covers this process; use the SQLite backend if ticks can overlap.

use crate::storage::traits::{KeyValueStore, StorageError, StorageResult, StoredValue};
use chrono::Utc;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type Document = HashMap<String, StoredValue>;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }

    fn read(&self) -> StorageResult<Document> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Document::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, document: &Document) -> StorageResult<()> {
        let now = Utc::now();
        let live: HashMap<&String, &StoredValue> =
            document.iter().filter(|(_, v)| v.is_live(now)).collect();

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, serde_json::to_vec_pretty(&live)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.guard()?;
        let now = Utc::now();
        Ok(self
            .read()?
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    fn save(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()> {
        let _guard = self.guard()?;
        let mut document = self.read()?;
        document.insert(key.to_string(), StoredValue::new(value, ttl, Utc::now()));
        self.write(&document)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let _guard = self.guard()?;
        let mut document = self.read()?;
        if document.remove(key).is_some() {
            self.write(&document)?;
        }
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new_value: Option<&str>,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        let _guard = self.guard()?;
        let now = Utc::now();
        let mut document = self.read()?;

        let current = document
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.as_str());
        if current != expected {
            return Ok(false);
        }

        match new_value {
            Some(value) => {
                document.insert(key.to_string(), StoredValue::new(value, ttl, now));
            }
            None => {
                document.remove(key);
            }
        }
        self.write(&document)?;
        Ok(true)
    }
}
