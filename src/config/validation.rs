use crate::config::types::{
    Config, PurgeConfig, SiteConfig, StorageBackend, StorageConfig, WarmupConfig,
};
use crate::schedule::Schedule;
use crate::ConfigError;
use url::Url;

/// Longest queue lifetime accepted (one year)
const MAX_QUEUE_TTL_SECS: u64 = 365 * 24 * 3600;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_warmup_config(&config.warmup)?;
    validate_storage_config(&config.storage)?;
    Schedule::from_config(&config.schedule)?;
    if let Some(purge) = &config.purge {
        validate_purge_config(purge)?;
    }
    Ok(())
}

/// Validates site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let root = Url::parse(&config.root)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site root '{}': {}", config.root, e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Site root '{}' must use http or https",
            config.root
        )));
    }

    if config.sitemaps.is_empty() {
        return Err(ConfigError::Validation(
            "at least one sitemap entry is required".to_string(),
        ));
    }

    config
        .sitemap_urls()
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap entry: {}", e)))?;

    if config.sitemap_limit < 1 {
        return Err(ConfigError::Validation(
            "sitemap_limit must be >= 1".to_string(),
        ));
    }

    if config.max_documents < 1 {
        return Err(ConfigError::Validation(
            "max_documents must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates warmup configuration
fn validate_warmup_config(config: &WarmupConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs >= config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs ({}) must be shorter than timeout_secs ({})",
            config.connect_timeout_secs, config.timeout_secs
        )));
    }

    for (name, [lo, hi]) in [
        ("retry_backoff_ms", config.retry_backoff_ms),
        ("pacing_ms", config.pacing_ms),
    ] {
        if lo > hi {
            return Err(ConfigError::Validation(format!(
                "{} range is inverted: [{}, {}]",
                name, lo, hi
            )));
        }
    }

    if let Some(status) = config
        .retry_statuses
        .iter()
        .find(|s| !(100..=599).contains(*s))
    {
        return Err(ConfigError::Validation(format!(
            "retry status {} is not an HTTP status code",
            status
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.backend != StorageBackend::Memory && config.path.is_empty() {
        return Err(ConfigError::Validation(
            "storage path cannot be empty".to_string(),
        ));
    }

    if config.namespace.is_empty() {
        return Err(ConfigError::Validation(
            "storage namespace cannot be empty".to_string(),
        ));
    }

    if !config
        .namespace
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "namespace must contain only alphanumeric characters, '_' and '-', got '{}'",
            config.namespace
        )));
    }

    if config.queue_ttl_secs < 1 || config.queue_ttl_secs > MAX_QUEUE_TTL_SECS {
        return Err(ConfigError::Validation(format!(
            "queue_ttl_secs must be between 1 and {}, got {}",
            MAX_QUEUE_TTL_SECS, config.queue_ttl_secs
        )));
    }

    Ok(())
}

/// Validates purge configuration
fn validate_purge_config(config: &PurgeConfig) -> Result<(), ConfigError> {
    if config.zone_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "purge zone_id cannot be empty".to_string(),
        ));
    }

    if config.token_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "purge token_env cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid purge api_base: {}", e)))?;

    Ok(())
}
