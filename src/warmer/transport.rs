//! HTTP transport used for warmup requests and sitemap downloads
//!
//! The fetcher and the sitemap resolver talk to the network only through the
//! [`Transport`] trait, so tests can substitute a fake with scripted statuses
//! and controllable latency.

use crate::config::{HeaderConfig, WarmupConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use thiserror::Error;

/// Transport-level failure (no HTTP status was obtained)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Request failed for {url}: {message}")]
    Other { url: String, message: String },
}

impl TransportError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect {
                url,
                message: error.to_string(),
            }
        } else if error.is_redirect() {
            Self::RedirectLimit { url }
        } else {
            Self::Other {
                url,
                message: error.to_string(),
            }
        }
    }
}

/// Minimal HTTP capability needed by the warmer
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a warmup GET, consumes and discards the body, and returns the final status
    async fn get_status(&self, url: &str) -> Result<u16, TransportError>;

    /// Issues a GET and returns the final status with the decoded body text
    async fn get_text(&self, url: &str) -> Result<(u16, String), TransportError>;
}

/// Builds an HTTP client with the warmup request policy
///
/// The client follows up to `max_redirects` redirects, applies the total and
/// connect timeouts, and sends the configured browser-like User-Agent, Accept
/// and Accept-Language headers on every request.
pub fn build_http_client(
    headers: &HeaderConfig,
    warmup: &WarmupConfig,
) -> Result<Client, reqwest::Error> {
    let mut defaults = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&headers.accept) {
        defaults.insert(ACCEPT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&headers.accept_language) {
        defaults.insert(ACCEPT_LANGUAGE, value);
    }

    Client::builder()
        .user_agent(headers.user_agent.clone())
        .default_headers(defaults)
        .timeout(warmup.timeout())
        .connect_timeout(warmup.connect_timeout())
        .redirect(Policy::limited(warmup.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    accept_encoding: Option<HeaderValue>,
}

impl HttpTransport {
    pub fn new(headers: &HeaderConfig, warmup: &WarmupConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(headers, warmup)?,
            accept_encoding: HeaderValue::from_str(&headers.accept_encoding).ok(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_status(&self, url: &str) -> Result<u16, TransportError> {
        // Warm requests advertise the browser encoding set so the cache stores
        // the same variant real visitors get; the body is never decoded.
        let mut request = self.client.get(url);
        if let Some(encoding) = &self.accept_encoding {
            request = request.header(ACCEPT_ENCODING, encoding.clone());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        let status = response.status().as_u16();

        while response
            .chunk()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?
            .is_some()
        {}

        Ok(status)
    }

    async fn get_text(&self, url: &str) -> Result<(u16, String), TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        Ok((status, body))
    }
}
