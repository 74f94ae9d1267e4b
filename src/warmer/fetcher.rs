//! Batch warmup fetcher
//!
//! This module issues the warmup requests for one batch, including:
//! - Keeping up to `concurrency` requests in flight, admitting the next pending
//!   URL as soon as any request completes
//! - Retrying 429/503 responses with a jittered backoff, up to `max_retry` times
//! - Pacing requests with a small random delay after every completion
//! - A sequential mode with exactly the same retry policy
//!
//! Nothing here touches persisted state; the caller records the returned counts.

use crate::config::{FetchMode, WarmupConfig};
use crate::state::BatchResult;
use crate::warmer::outcome::FetchOutcome;
use crate::warmer::transport::Transport;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Retry and pacing policy shared by both fetch modes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retry: u32,
    pub retry_statuses: Vec<u16>,
    pub backoff_ms: [u64; 2],
    pub pacing_ms: [u64; 2],
}

impl RetryPolicy {
    pub fn from_config(config: &WarmupConfig) -> Self {
        Self {
            max_retry: config.max_retry,
            retry_statuses: config.retry_statuses.clone(),
            backoff_ms: config.retry_backoff_ms,
            pacing_ms: config.pacing_ms,
        }
    }
}

/// Picks a uniformly random duration within an inclusive millisecond range
fn jitter([lo, hi]: [u64; 2]) -> Duration {
    if hi <= lo {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}

async fn pause(range: [u64; 2]) {
    let delay = jitter(range);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Per-URL retry counts, scoped to one `warm` call
#[derive(Debug, Default)]
pub struct RetryState {
    counts: HashMap<String, u32>,
}

impl RetryState {
    /// Records a retry for `url` if it still has budget; returns whether it does
    pub fn try_retry(&mut self, url: &str, max_retry: u32) -> bool {
        let count = self.counts.entry(url.to_string()).or_insert(0);
        if *count < max_retry {
            *count += 1;
            true
        } else {
            false
        }
    }

    pub fn retries(&self, url: &str) -> u32 {
        self.counts.get(url).copied().unwrap_or(0)
    }
}

/// What to do with a URL after one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Ok,
    Fail,
    Retry(Duration),
}

/// A URL waiting for a request slot
#[derive(Debug)]
struct Pending {
    url: String,
    delay: Duration,
}

/// Issues warmup requests for batches of URLs
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    mode: FetchMode,
    concurrency: usize,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, config: &WarmupConfig) -> Self {
        Self {
            transport,
            policy: RetryPolicy::from_config(config),
            mode: config.mode,
            concurrency: config.concurrency,
        }
    }

    /// Warms a batch using the configured mode and concurrency
    pub async fn warm_batch(&self, urls: &[String]) -> BatchResult {
        match self.mode {
            FetchMode::Concurrent => self.warm(urls, self.concurrency).await,
            FetchMode::Sequential => self.warm_sequential(urls).await,
        }
    }

    fn decide(&self, url: &str, outcome: &FetchOutcome, retries: &mut RetryState) -> Decision {
        match outcome {
            FetchOutcome::Success(status) => {
                tracing::debug!("Warmed {} ({})", url, status);
                Decision::Ok
            }
            FetchOutcome::Retryable(status) => {
                if retries.try_retry(url, self.policy.max_retry) {
                    let delay = jitter(self.policy.backoff_ms);
                    tracing::debug!(
                        "{} returned {}, retry {}/{} in {:?}",
                        url,
                        status,
                        retries.retries(url),
                        self.policy.max_retry,
                        delay
                    );
                    Decision::Retry(delay)
                } else {
                    tracing::warn!("{} still returning {} after {} retries", url, status, self.policy.max_retry);
                    Decision::Fail
                }
            }
            FetchOutcome::HttpFailure(status) => {
                tracing::warn!("{} returned {}", url, status);
                Decision::Fail
            }
            FetchOutcome::NetworkFailure(e) => {
                tracing::warn!("{}", e);
                Decision::Fail
            }
        }
    }

    /// Warms `urls` keeping at most `concurrency` requests in flight
    ///
    /// The active set is refilled one URL at a time as requests complete, so it
    /// stays saturated until the pending list runs dry. Retried URLs go to the
    /// back of the pending list and wait out their backoff inside their slot.
    pub async fn warm(&self, urls: &[String], concurrency: usize) -> BatchResult {
        let limit = concurrency.max(1);
        let mut result = BatchResult::for_batch(urls.len());
        let mut retries = RetryState::default();
        let mut pending: VecDeque<Pending> = urls
            .iter()
            .map(|url| Pending {
                url: url.clone(),
                delay: Duration::ZERO,
            })
            .collect();
        let mut active = JoinSet::new();

        loop {
            while active.len() < limit {
                let Some(next) = pending.pop_front() else {
                    break;
                };
                let transport = Arc::clone(&self.transport);
                active.spawn(async move {
                    if !next.delay.is_zero() {
                        tokio::time::sleep(next.delay).await;
                    }
                    let response = transport.get_status(&next.url).await;
                    (next.url, response)
                });
            }

            let Some(joined) = active.join_next().await else {
                break;
            };

            match joined {
                Ok((url, response)) => {
                    let outcome = FetchOutcome::classify(response, &self.policy.retry_statuses);
                    match self.decide(&url, &outcome, &mut retries) {
                        Decision::Ok => result.ok += 1,
                        Decision::Fail => result.fail += 1,
                        Decision::Retry(delay) => pending.push_back(Pending { url, delay }),
                    }
                }
                Err(e) => {
                    tracing::error!("Warmup task aborted: {}", e);
                    result.fail += 1;
                }
            }

            pause(self.policy.pacing_ms).await;
        }

        tracing::info!(
            "Batch warmed: ok={} fail={} total={}",
            result.ok,
            result.fail,
            result.total
        );
        result
    }

    /// Warms `urls` one request at a time
    ///
    /// Counts match [`Fetcher::warm`] for the same server behaviour; only the
    /// throughput differs.
    pub async fn warm_sequential(&self, urls: &[String]) -> BatchResult {
        let mut result = BatchResult::for_batch(urls.len());
        let mut retries = RetryState::default();

        for url in urls {
            loop {
                let response = self.transport.get_status(url).await;
                let outcome = FetchOutcome::classify(response, &self.policy.retry_statuses);
                match self.decide(url, &outcome, &mut retries) {
                    Decision::Ok => {
                        result.ok += 1;
                        break;
                    }
                    Decision::Fail => {
                        result.fail += 1;
                        break;
                    }
                    Decision::Retry(delay) => tokio::time::sleep(delay).await,
                }
            }

            pause(self.policy.pacing_ms).await;
        }

        tracing::info!(
            "Batch warmed sequentially: ok={} fail={} total={}",
            result.ok,
            result.fail,
            result.total
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warmer::transport::TransportError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that answers from a per-URL script and tracks concurrency
    struct ScriptedTransport {
        scripts: Mutex<HashMap<String, VecDeque<Result<u16, TransportError>>>>,
        fallback: u16,
        latency: Duration,
        slow: HashMap<String, Duration>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<String>>,
        completed: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(fallback: u16, latency: Duration) -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                fallback,
                latency,
                slow: HashMap::new(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
                completed: Mutex::new(Vec::new()),
            }
        }

        fn slow_url(mut self, url: &str, latency: Duration) -> Self {
            self.slow.insert(url.to_string(), latency);
            self
        }

        fn script(self, url: &str, responses: Vec<Result<u16, TransportError>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_string(), responses.into());
            self
        }

        fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get_status(&self, url: &str) -> Result<u16, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(url.to_string());

            let latency = self.slow.get(url).copied().unwrap_or(self.latency);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let scripted = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(url)
                .and_then(|responses| responses.pop_front());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.lock().unwrap().push(url.to_string());
            scripted.unwrap_or(Ok(self.fallback))
        }

        async fn get_text(&self, _url: &str) -> Result<(u16, String), TransportError> {
            Ok((404, String::new()))
        }
    }

    fn test_config(mode: FetchMode, concurrency: usize) -> WarmupConfig {
        WarmupConfig {
            mode,
            concurrency,
            retry_backoff_ms: [0, 0],
            pacing_ms: [0, 0],
            ..WarmupConfig::default()
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/p/{}", i)).collect()
    }

    #[test]
    fn test_retry_state_budget() {
        let mut state = RetryState::default();
        assert!(state.try_retry("a", 2));
        assert!(state.try_retry("a", 2));
        assert!(!state.try_retry("a", 2));
        assert_eq!(state.retries("a"), 2);
        assert_eq!(state.retries("b"), 0);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let d = jitter([100, 300]);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(300));
        }
        assert_eq!(jitter([0, 0]), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_success_counted_once() {
        let transport = Arc::new(ScriptedTransport::new(200, Duration::ZERO));
        let fetcher = Fetcher::new(transport.clone(), &test_config(FetchMode::Concurrent, 5));

        let result = fetcher.warm(&urls(1), 5).await;

        assert_eq!(result, BatchResult { ok: 1, fail: 0, total: 1 });
        assert_eq!(transport.calls_for("https://example.com/p/0"), 1);
    }

    #[tokio::test]
    async fn test_never_exceeds_concurrency() {
        let transport = Arc::new(ScriptedTransport::new(200, Duration::from_millis(20)));
        let fetcher = Fetcher::new(transport.clone(), &test_config(FetchMode::Concurrent, 3));

        let result = fetcher.warm(&urls(20), 3).await;

        assert_eq!(result.ok, 20);
        assert_eq!(transport.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_completion_admits_next_url_immediately() {
        let slow = "https://example.com/p/0";
        let transport = Arc::new(
            ScriptedTransport::new(200, Duration::from_millis(10))
                .slow_url(slow, Duration::from_millis(300)),
        );
        let fetcher = Fetcher::new(transport.clone(), &test_config(FetchMode::Concurrent, 2));

        let started = tokio::time::Instant::now();
        let result = fetcher.warm(&urls(12), 2).await;
        let elapsed = started.elapsed();

        assert_eq!(result.ok, 12);
        assert_eq!(transport.peak.load(Ordering::SeqCst), 2);

        // The fast URLs cycle through the second slot while the slow one holds the first
        let completed = transport.completed.lock().unwrap().clone();
        assert_eq!(completed.len(), 12);
        assert_eq!(completed.last().map(String::as_str), Some(slow));

        // Fixed waves of two would need at least 300 + 5 * 10 ms
        assert!(elapsed < Duration::from_millis(340), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_persistent_503_fails_once_after_retries() {
        let url = "https://example.com/p/0";
        let transport = Arc::new(ScriptedTransport::new(503, Duration::ZERO));
        let fetcher = Fetcher::new(transport.clone(), &test_config(FetchMode::Concurrent, 5));

        let result = fetcher.warm(&urls(1), 5).await;

        assert_eq!(result, BatchResult { ok: 0, fail: 1, total: 1 });
        // one initial attempt plus max_retry retries
        assert_eq!(transport.calls_for(url), 4);
    }

    #[tokio::test]
    async fn test_429_then_success_counts_ok() {
        let url = "https://example.com/p/0";
        let transport = Arc::new(
            ScriptedTransport::new(200, Duration::ZERO).script(url, vec![Ok(429), Ok(429)]),
        );
        let fetcher = Fetcher::new(transport.clone(), &test_config(FetchMode::Concurrent, 2));

        let result = fetcher.warm(&urls(1), 2).await;

        assert_eq!(result, BatchResult { ok: 1, fail: 0, total: 1 });
        assert_eq!(transport.calls_for(url), 3);
    }

    #[tokio::test]
    async fn test_terminal_failures_not_retried() {
        let transport = Arc::new(
            ScriptedTransport::new(200, Duration::ZERO)
                .script("https://example.com/p/0", vec![Ok(404)])
                .script(
                    "https://example.com/p/1",
                    vec![Err(TransportError::Timeout {
                        url: "https://example.com/p/1".to_string(),
                    })],
                )
                .script("https://example.com/p/2", vec![Ok(500)]),
        );
        let fetcher = Fetcher::new(transport.clone(), &test_config(FetchMode::Concurrent, 5));

        let result = fetcher.warm(&urls(4), 5).await;

        assert_eq!(result, BatchResult { ok: 1, fail: 3, total: 4 });
        assert_eq!(transport.calls_for("https://example.com/p/0"), 1);
        assert_eq!(transport.calls_for("https://example.com/p/1"), 1);
        assert_eq!(transport.calls_for("https://example.com/p/2"), 1);
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent_counts() {
        let scripted = || {
            ScriptedTransport::new(200, Duration::ZERO)
                .script("https://example.com/p/0", vec![Ok(503), Ok(503), Ok(503), Ok(503)])
                .script("https://example.com/p/1", vec![Ok(429), Ok(204)])
                .script("https://example.com/p/2", vec![Ok(410)])
        };

        let concurrent = Fetcher::new(
            Arc::new(scripted()),
            &test_config(FetchMode::Concurrent, 2),
        )
        .warm_batch(&urls(5))
        .await;

        let sequential_transport = Arc::new(scripted());
        let sequential = Fetcher::new(
            sequential_transport.clone(),
            &test_config(FetchMode::Sequential, 2),
        )
        .warm_batch(&urls(5))
        .await;

        assert_eq!(concurrent, BatchResult { ok: 3, fail: 2, total: 5 });
        assert_eq!(sequential, concurrent);
        assert_eq!(sequential_transport.peak.load(Ordering::SeqCst), 1);
        assert_eq!(sequential_transport.calls_for("https://example.com/p/0"), 4);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let transport = Arc::new(ScriptedTransport::new(200, Duration::ZERO));
        let fetcher = Fetcher::new(transport, &test_config(FetchMode::Concurrent, 5));
        assert_eq!(fetcher.warm(&[], 5).await, BatchResult::default());
    }
}
