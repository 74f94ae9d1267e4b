//! Configuration module for cache-warmer
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section except `[site]` is optional and falls back to the defaults of
//! the weekly warmup job (batch 50, concurrency 5, 20s timeout, 3 retries).
//!
//! # Example
//!
//! ```no_run
//! use cache_warmer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("warmer.toml")).unwrap();
//! println!("Batch size: {}", config.warmup.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Cadence, Config, FetchMode, FilterConfig, HeaderConfig, PurgeConfig, ScheduleConfig,
    SiteConfig, StorageBackend, StorageConfig, WarmupConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
