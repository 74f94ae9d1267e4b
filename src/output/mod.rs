//! Output module for console reports
//!
//! This module handles:
//! - Rendering persisted progress for `--status`
//! - Summarizing tick outcomes

mod report;

pub use report::{format_outcome, format_status, print_status};
