//! cache-warmer: scheduled sitemap-driven cache warmup
//!
//! This crate discovers a site's pages from its sitemap hierarchy, filters them
//! down to cacheable URLs, and re-requests them in resumable batches so that a
//! downstream cache stays populated. Each invocation is a single short-lived
//! "tick"; all state that must survive between ticks lives in a key-value store.

pub mod config;
pub mod output;
pub mod purge;
pub mod runner;
pub mod schedule;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod url;
pub mod warmer;

use thiserror::Error;

/// Main error type for cache-warmer operations
///
/// Per-URL and sitemap discovery failures are never surfaced through this type;
/// they are logged and counted. Only failures that make a tick impossible to
/// carry out (bad configuration, broken storage, client construction) end up here.
#[derive(Debug, Error)]
pub enum WarmError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Result type alias for cache-warmer operations
pub type Result<T> = std::result::Result<T, WarmError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use runner::{Runner, TickOutcome};
pub use state::{BatchResult, RunResult};
pub use url::filter_urls;
