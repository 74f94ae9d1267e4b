use crate::config::StorageConfig;
use crate::state::progress::RunResult;
use crate::storage::{KeyValueStore, StorageError, StorageResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Attempts at a read-modify-write before giving up
const MAX_CAS_ATTEMPTS: usize = 8;

/// URLs taken off the queue for one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub urls: Vec<String>,
    /// Queue length left behind, already persisted
    pub remaining: usize,
}

/// Persisted FIFO of URLs still to warm, plus the run counters
///
/// The queue entry carries a TTL so an abandoned drain does not linger past a
/// reasonable window; the result entry never expires and is overwritten by the
/// next rebuild.
pub struct WarmQueue {
    store: Arc<dyn KeyValueStore>,
    queue_key: String,
    result_key: String,
    ttl: Duration,
}

impl WarmQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            queue_key: config.queue_key(),
            result_key: config.result_key(),
            ttl: config.queue_ttl(),
        }
    }

    /// Loads the queued URLs; `None` when missing or expired
    pub fn load(&self) -> StorageResult<Option<Vec<String>>> {
        match self.store.load(&self.queue_key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Installs `urls` as the queue and starts a fresh run
    ///
    /// The queue is only written if no other tick has built one since it was
    /// found missing or empty. Returns `None` when that swap loses; the caller
    /// should then pop from the queue the other tick built.
    pub fn rebuild(
        &self,
        urls: &[String],
        config_hash: Option<&str>,
    ) -> StorageResult<Option<RunResult>> {
        let current = self.store.load(&self.queue_key)?;
        if let Some(raw) = &current {
            let queued: Vec<String> = serde_json::from_str(raw)?;
            if !queued.is_empty() {
                tracing::debug!("Queue already rebuilt with {} URLs", queued.len());
                return Ok(None);
            }
        }

        let encoded = serde_json::to_string(urls)?;
        if !self.store.compare_and_swap(
            &self.queue_key,
            current.as_deref(),
            Some(&encoded),
            Some(self.ttl),
        )? {
            tracing::debug!("Queue rebuilt by a concurrent tick");
            return Ok(None);
        }

        let result = RunResult::new(urls.len(), Utc::now()).with_config_hash(config_hash);
        self.save_result(&result)?;

        tracing::info!("Queue ready: {} URLs", urls.len());
        Ok(Some(result))
    }

    /// Takes up to `n` URLs off the front of the queue
    ///
    /// The remainder is persisted before this returns. The read-modify-write is
    /// a compare-and-swap, so two overlapping ticks can never take the same
    /// batch. Returns `None` if there is no queue.
    pub fn pop_batch(&self, n: usize) -> StorageResult<Option<Batch>> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(raw) = self.store.load(&self.queue_key)? else {
                return Ok(None);
            };

            let mut urls: Vec<String> = serde_json::from_str(&raw)?;
            let remainder = urls.split_off(n.min(urls.len()));
            let encoded = serde_json::to_string(&remainder)?;

            if self.store.compare_and_swap(
                &self.queue_key,
                Some(&raw),
                Some(&encoded),
                Some(self.ttl),
            )? {
                return Ok(Some(Batch {
                    urls,
                    remaining: remainder.len(),
                }));
            }

            tracing::debug!("Queue changed during pop (attempt {}), retrying", attempt);
        }

        Err(StorageError::Contention(self.queue_key.clone()))
    }

    /// Deletes the queue entry
    pub fn clear(&self) -> StorageResult<()> {
        self.store.delete(&self.queue_key)
    }

    /// Deletes the queue entry only while it is still the empty list
    ///
    /// Returns `false` when a concurrent tick has already rebuilt or removed it.
    pub fn clear_if_drained(&self) -> StorageResult<bool> {
        let empty = serde_json::to_string(&Vec::<String>::new())?;
        self.store
            .compare_and_swap(&self.queue_key, Some(&empty), None, None)
    }

    pub fn load_result(&self) -> StorageResult<Option<RunResult>> {
        match self.store.load(&self.result_key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save_result(&self, result: &RunResult) -> StorageResult<()> {
        self.store
            .save(&self.result_key, &serde_json::to_string(result)?, None)
    }

    /// Applies `update` to the stored run result as one compare-and-swap
    ///
    /// `update` may run more than once if another tick writes the result in
    /// between, so it must be a pure function of its input.
    pub fn update_result<F>(&self, update: F) -> StorageResult<RunResult>
    where
        F: Fn(Option<RunResult>) -> RunResult,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let raw = self.store.load(&self.result_key)?;
            let current = match &raw {
                Some(raw) => Some(serde_json::from_str(raw)?),
                None => None,
            };

            let next = update(current);
            let encoded = serde_json::to_string(&next)?;
            if self
                .store
                .compare_and_swap(&self.result_key, raw.as_deref(), Some(&encoded), None)?
            {
                return Ok(next);
            }

            tracing::debug!("Run result changed during update (attempt {}), retrying", attempt);
        }

        Err(StorageError::Contention(self.result_key.clone()))
    }
}
