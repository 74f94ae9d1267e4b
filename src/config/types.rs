use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for cache-warmer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub warmup: WarmupConfig,
    #[serde(default)]
    pub headers: HeaderConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub purge: Option<PurgeConfig>,
}

impl Config {
    /// Builds a configuration with every section at its defaults
    pub fn for_site(root: &str) -> Self {
        Self {
            site: SiteConfig {
                root: root.to_string(),
                sitemaps: default_sitemaps(),
                sitemap_limit: default_sitemap_limit(),
                max_documents: default_max_documents(),
            },
            warmup: WarmupConfig::default(),
            headers: HeaderConfig::default(),
            filter: FilterConfig::default(),
            storage: StorageConfig::default(),
            schedule: ScheduleConfig::default(),
            purge: None,
        }
    }
}

/// Site and sitemap discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the site (e.g., "https://example.com")
    pub root: String,

    /// Sitemap paths or absolute URLs to start discovery from
    #[serde(default = "default_sitemaps")]
    pub sitemaps: Vec<String>,

    /// Maximum number of page URLs collected per rebuild
    #[serde(rename = "sitemap-limit", default = "default_sitemap_limit")]
    pub sitemap_limit: usize,

    /// Maximum number of sitemap documents fetched per rebuild
    #[serde(rename = "max-documents", default = "default_max_documents")]
    pub max_documents: usize,
}

impl SiteConfig {
    /// Resolves the configured sitemap entries against the site root
    pub fn sitemap_urls(&self) -> Result<Vec<String>, url::ParseError> {
        let root = url::Url::parse(&self.root)?;
        self.sitemaps
            .iter()
            .map(|entry| root.join(entry).map(|u| u.to_string()))
            .collect()
    }
}

/// How the fetcher issues requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Bounded pool of in-flight requests
    Concurrent,
    /// One request at a time, same retry policy
    Sequential,
}

/// Warmup behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WarmupConfig {
    /// Number of URLs popped from the queue per tick
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of in-flight requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_mode")]
    pub mode: FetchMode,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout (seconds), must be shorter than the total timeout
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Retries allowed per URL for retryable statuses
    #[serde(rename = "max-retry", default = "default_max_retry")]
    pub max_retry: u32,

    /// Statuses that are retried instead of failing immediately
    #[serde(rename = "retry-statuses", default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// Backoff range before a retried request (milliseconds, inclusive)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: [u64; 2],

    /// Pacing delay range after each completed request (milliseconds, inclusive)
    #[serde(rename = "pacing-ms", default = "default_pacing_ms")]
    pub pacing_ms: [u64; 2],

    /// Delay before the next tick when work remains (seconds)
    #[serde(rename = "reschedule-delay-secs", default = "default_reschedule_delay_secs")]
    pub reschedule_delay_secs: u64,
}

impl WarmupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reschedule_delay(&self) -> Duration {
        Duration::from_secs(self.reschedule_delay_secs)
    }
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            mode: default_mode(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_retry: default_max_retry(),
            retry_statuses: default_retry_statuses(),
            retry_backoff_ms: default_retry_backoff_ms(),
            pacing_ms: default_pacing_ms(),
            reschedule_delay_secs: default_reschedule_delay_secs(),
        }
    }
}

/// Request headers sent with every warmup request
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    #[serde(rename = "accept-encoding", default = "default_accept_encoding")]
    pub accept_encoding: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            accept_encoding: default_accept_encoding(),
        }
    }
}

/// Denylists applied by the URL filter
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Path segments marking account/commerce flows (case-insensitive)
    #[serde(rename = "denied-segments", default = "default_denied_segments")]
    pub denied_segments: Vec<String>,

    /// Query parameter name patterns; a trailing `*` matches any suffix
    #[serde(rename = "denied-params", default = "default_denied_params")]
    pub denied_params: Vec<String>,

    /// Path segments marking API namespaces
    #[serde(rename = "api-segments", default = "default_api_segments")]
    pub api_segments: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            denied_segments: default_denied_segments(),
            denied_params: default_denied_params(),
            api_segments: default_api_segments(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

/// Persisted state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Path to the JSON file or SQLite database (ignored for memory)
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Prefix for the queue and result keys
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Time-to-live of the persisted queue (seconds)
    #[serde(rename = "queue-ttl-secs", default = "default_queue_ttl_secs")]
    pub queue_ttl_secs: u64,
}

impl StorageConfig {
    pub fn queue_key(&self) -> String {
        format!("{}_queue", self.namespace)
    }

    pub fn result_key(&self) -> String {
        format!("{}_result", self.namespace)
    }

    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
            namespace: default_namespace(),
            queue_ttl_secs: default_queue_ttl_secs(),
        }
    }
}

/// How often the external scheduler should fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
}

/// Schedule of the first tick of each drain cycle
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_cadence")]
    pub cadence: Cadence,

    /// Three-letter weekday for weekly cadence (e.g., "sun")
    #[serde(default = "default_weekday")]
    pub weekday: String,

    /// Local time of day, "HH:MM"
    #[serde(default = "default_at")]
    pub at: String,

    /// Offset of the site's local time from UTC, "+HH:MM" or "-HH:MM"
    ///
    /// Fixed all year; zones with daylight saving must be updated by hand.
    #[serde(rename = "utc-offset", default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            weekday: default_weekday(),
            at: default_at(),
            utc_offset: default_utc_offset(),
        }
    }
}

/// CDN purge job configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PurgeConfig {
    #[serde(rename = "zone-id")]
    pub zone_id: String,

    /// Environment variable holding the API token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    #[serde(rename = "api-base", default = "default_api_base")]
    pub api_base: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sitemaps() -> Vec<String> {
    vec!["/sitemap_index.xml".to_string()]
}

fn default_sitemap_limit() -> usize {
    5000
}

fn default_max_documents() -> usize {
    1000
}

fn default_batch_size() -> usize {
    50
}

fn default_concurrency() -> usize {
    5
}

fn default_mode() -> FetchMode {
    FetchMode::Concurrent
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_retry() -> u32 {
    3
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 503]
}

fn default_retry_backoff_ms() -> [u64; 2] {
    [100, 300]
}

fn default_pacing_ms() -> [u64; 2] {
    [10, 30]
}

fn default_reschedule_delay_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36".to_string()
}

fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_accept_encoding() -> String {
    "gzip, deflate, br".to_string()
}

fn default_denied_segments() -> Vec<String> {
    ["cart", "checkout", "my-account", "account"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_denied_params() -> Vec<String> {
    [
        "add-to-cart",
        "orderby",
        "wpf_*",
        "wc-ajax",
        "preview",
        "customize_changeset_uuid",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_api_segments() -> Vec<String> {
    vec!["wp-json".to_string()]
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_storage_path() -> String {
    "./cache-warmer.db".to_string()
}

fn default_namespace() -> String {
    "cache_warmer".to_string()
}

fn default_queue_ttl_secs() -> u64 {
    3600
}

fn default_cadence() -> Cadence {
    Cadence::Weekly
}

fn default_weekday() -> String {
    "sun".to_string()
}

fn default_at() -> String {
    "03:07".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_token_env() -> String {
    "CF_API_TOKEN".to_string()
}

fn default_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}
