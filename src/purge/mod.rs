//! Full CDN cache purge
//!
//! Calls the Cloudflare `purge_cache` endpoint with `purge_everything`. This is
//! a separate maintenance job: the warmup flow never depends on it, and it is
//! usually scheduled shortly before a warmup cycle starts.

use crate::config::PurgeConfig;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Characters of the response body included in the log line
const BODY_PREVIEW_CHARS: usize = 80;

/// Errors that prevent a purge from being attempted at all
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("API token environment variable '{0}' is not set")]
    MissingToken(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result of a purge, after the retry if one was needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub success: bool,
    /// Requests sent (1 or 2)
    pub attempts: u32,
    /// Status of the last response, if any response arrived
    pub status: Option<u16>,
}

/// Client for one zone's purge endpoint
pub struct PurgeClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl PurgeClient {
    pub fn new(config: &PurgeConfig, token: String) -> Result<Self, PurgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/zones/{}/purge_cache",
                config.api_base.trim_end_matches('/'),
                config.zone_id
            ),
            token,
        })
    }

    /// Creates a client with the token read from the configured variable
    pub fn from_env(config: &PurgeConfig) -> Result<Self, PurgeError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| PurgeError::MissingToken(config.token_env.clone()))?;
        Self::new(config, token)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one purge request
    ///
    /// Returns the response status, or `None` when no response arrived.
    pub async fn purge_once(&self) -> Option<u16> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "purge_everything": true }))
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::info!("Purge response: status={} body={}", status, preview(&body));
                Some(status)
            }
            Err(e) => {
                tracing::error!("Purge request failed: {}", e);
                None
            }
        }
    }

    /// Purges everything, retrying once immediately on failure
    pub async fn purge_everything(&self) -> PurgeOutcome {
        let started = std::time::Instant::now();
        tracing::info!("Purging everything via {}", self.endpoint);

        let mut attempts = 1;
        let mut status = self.purge_once().await;
        if !is_success(status) {
            tracing::warn!("Purge failed, retrying once");
            attempts += 1;
            status = self.purge_once().await;
        }

        let success = is_success(status);
        tracing::info!(
            "Purge {} after {} attempt(s) in {:?}",
            if success { "succeeded" } else { "failed" },
            attempts,
            started.elapsed()
        );

        PurgeOutcome {
            success,
            attempts,
            status,
        }
    }
}

fn is_success(status: Option<u16>) -> bool {
    matches!(status, Some(200..=299))
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
