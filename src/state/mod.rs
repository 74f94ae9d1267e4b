//! State module for tracking warmup progress across ticks
//!
//! # Components
//!
//! - `WarmQueue`: the persisted FIFO of URLs still to warm, and the run result
//! - `RunResult` / `BatchResult`: cumulative and per-batch counters
//! - `DrainState`: where the current drain cycle stands

mod drain;
mod progress;
mod queue;

// Re-export main types
pub use drain::DrainState;
pub use progress::{finalize, record_batch, BatchResult, RunResult};
pub use queue::{Batch, WarmQueue};
