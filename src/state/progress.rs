//! Run-level progress accounting
//!
//! A [`RunResult`] exists once per drain cycle. It is created when the queue is
//! (re)built, accumulates every batch's counts, and is finalized with an end
//! timestamp when the queue empties. It knows nothing about individual URLs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counts for one warmed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub ok: u64,
    pub fail: u64,
    pub total: u64,
}

impl BatchResult {
    /// Empty counters for a batch of `len` URLs
    pub fn for_batch(len: usize) -> Self {
        Self {
            ok: 0,
            fail: 0,
            total: len as u64,
        }
    }

    pub fn processed(&self) -> u64 {
        self.ok + self.fail
    }
}

/// Cumulative counters for one drain cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub started_at: DateTime<Utc>,
    pub ok: u64,
    pub fail: u64,
    /// Queue length at rebuild time; never recomputed from batches
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Hash of the configuration the cycle was started with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

impl RunResult {
    pub fn new(total: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ok: 0,
            fail: 0,
            total: total as u64,
            ended_at: None,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: Option<&str>) -> Self {
        self.config_hash = hash.map(str::to_string);
        self
    }

    pub fn processed(&self) -> u64 {
        self.ok + self.fail
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Adds one batch's counts to the run totals
///
/// Pure accumulation: `ok` and `fail` grow, `total` and timestamps are untouched.
pub fn record_batch(existing: RunResult, batch: &BatchResult) -> RunResult {
    RunResult {
        ok: existing.ok + batch.ok,
        fail: existing.fail + batch.fail,
        ..existing
    }
}

/// Marks the run as ended at `now`
pub fn finalize(result: RunResult, now: DateTime<Utc>) -> RunResult {
    RunResult {
        ended_at: Some(now),
        ..result
    }
}
