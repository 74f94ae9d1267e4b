//! Storage module for persisting warmup state between ticks
//!
//! Every tick is a fresh process, so the queue and the run counters must live
//! outside it. This module provides a small key-value abstraction with
//! per-entry expiry and three interchangeable backends:
//! - `MemoryStore`: process-local, for tests and one-shot drains
//! - `FileStore`: a single JSON document on disk
//! - `SqliteStore`: a SQLite database, safe for overlapping processes

mod file;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{KeyValueStore, StorageError, StorageResult, StoredValue};

use crate::config::{StorageBackend, StorageConfig};
use std::path::Path;
use std::sync::Arc;

/// Opens the backend selected by the storage configuration
///
/// # Arguments
///
/// * `config` - The storage configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn KeyValueStore>)` - Ready-to-use store
/// * `Err(StorageError)` - Failed to open the database
pub fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::new(Path::new(&config.path))),
        StorageBackend::Sqlite => {
            let store = SqliteStore::new(Path::new(&config.path))?;
            let dropped = store.purge_expired()?;
            if dropped > 0 {
                tracing::debug!("Dropped {} expired entries from {}", dropped, config.path);
            }
            Arc::new(store)
        }
    };
    tracing::debug!("Opened {:?} store", config.backend);
    Ok(store)
}
