//! Storage traits and error types
//!
//! This module defines the key-value interface every persistence backend
//! implements, along with the stored entry representation shared by the
//! in-process backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),

    #[error("Invalid expiry timestamp: {0}")]
    InvalidExpiry(String),

    #[error("Concurrent modification of '{0}' did not settle")]
    Contention(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A value with an optional absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    pub fn new(value: &str, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| expiry_from(now, ttl)),
        }
    }

    /// An entry expires at the instant its deadline is reached
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// Converts a TTL into an absolute deadline, saturating on overflow
pub fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Key-value persistence with per-entry expiry
///
/// Expired entries behave exactly like missing ones for every operation.
/// Implementations must be safe to share between threads.
pub trait KeyValueStore: Send + Sync {
    /// Loads the live value for `key`
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    ///
    /// `ttl` of `None` means the entry never expires.
    fn save(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()>;

    /// Removes `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Atomically replaces the value of `key` if it still equals `expected`
    ///
    /// `expected` of `None` means "no live entry". `new_value` of `None` deletes
    /// the entry. Returns `false` without writing when the current value differs.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new_value: Option<&str>,
        ttl: Option<Duration>,
    ) -> StorageResult<bool>;
}
