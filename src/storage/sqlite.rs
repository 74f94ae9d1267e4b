//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the KeyValueStore trait.
//! Compare-and-swap runs inside an IMMEDIATE transaction, which takes the
//! database write lock up front, so the swap is atomic across processes
//! sharing the same database file.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{expiry_from, KeyValueStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> StorageResult<usize> {
        let now = Utc::now();
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, expires_at FROM kv WHERE expires_at IS NOT NULL")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        let expired: Vec<String> = rows
            .into_iter()
            .filter(|(_, expires_at)| !is_live(Some(expires_at.as_str()), now).unwrap_or(false))
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        }
        Ok(expired.len())
    }
}

fn is_live(expires_at: Option<&str>, now: DateTime<Utc>) -> StorageResult<bool> {
    match expires_at {
        None => Ok(true),
        Some(raw) => {
            let deadline = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| StorageError::InvalidExpiry(format!("{}: {}", raw, e)))?;
            Ok(deadline.with_timezone(&Utc) > now)
        }
    }
}

/// Reads the live value of `key` on an open connection or transaction
fn live_value(conn: &Connection, key: &str, now: DateTime<Utc>) -> StorageResult<Option<String>> {
    let row: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT value, expires_at FROM kv WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((value, expires_at)) if is_live(expires_at.as_deref(), now)? => Ok(Some(value)),
        _ => Ok(None),
    }
}

fn upsert(
    conn: &Connection,
    key: &str,
    value: &str,
    ttl: Option<Duration>,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    let expires_at = ttl.map(|ttl| expiry_from(now, ttl).to_rfc3339());
    conn.execute(
        "INSERT INTO kv (key, value, expires_at, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at",
        params![key, value, expires_at, now.to_rfc3339()],
    )?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        live_value(&conn, key, Utc::now())
    }

    fn save(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()> {
        let conn = self.conn()?;
        upsert(&conn, key, value, ttl, Utc::now())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
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
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = live_value(&tx, key, now)?;
        if current.as_deref() != expected {
            return Ok(false);
        }

        match new_value {
            Some(value) => upsert(&tx, key, value, ttl, now)?,
            None => {
                tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            }
        }

        tx.commit()?;
        Ok(true)
    }
}
