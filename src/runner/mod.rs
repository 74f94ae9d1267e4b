//! Tick runner - one resumable step of a drain cycle
//!
//! Each tick is independent and short-lived:
//! 1. With no stored queue, discover URLs from the sitemaps, filter them and
//!    rebuild the queue together with a fresh run result
//! 2. Pop one batch (the remainder is persisted before any request is made)
//! 3. Warm the batch and add its counts to the run result
//! 4. Either report how much work remains, or finalize the run and clear the
//!    queue when the batch was the last one
//!
//! A tick killed mid-batch loses only that batch; the next tick picks up from
//! the persisted remainder.

use crate::config::Config;
use crate::sitemap::SitemapResolver;
use crate::state::{finalize, record_batch, DrainState, RunResult, WarmQueue};
use crate::storage::{open_store, KeyValueStore};
use crate::url::filter_urls;
use crate::warmer::{Fetcher, HttpTransport, Transport};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Discovery produced no URLs; nothing was queued
    NoUrls,
    /// A batch was warmed and work remains
    Batch {
        processed: u64,
        remaining: usize,
        /// Delay the caller should wait before the next tick
        next_tick_in: Duration,
    },
    /// The final batch was warmed and the run finalized
    Completed { result: RunResult },
}

/// URLs found by one discovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Page URLs collected from the sitemaps before filtering
    pub resolved: usize,
    /// Cacheable URLs, deduplicated, in sitemap order
    pub urls: Vec<String>,
}

/// Snapshot of persisted progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// URLs still queued; `None` when no queue is stored
    pub queued: Option<usize>,
    pub result: Option<RunResult>,
}

/// Drives drain cycles against one site
pub struct Runner {
    config: Arc<Config>,
    config_hash: Option<String>,
    queue: WarmQueue,
    resolver: SitemapResolver,
    fetcher: Fetcher,
}

impl Runner {
    /// Creates a runner over an explicit store and transport
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash recorded with every rebuilt run, if known
    /// * `store` - Where the queue and run result live between ticks
    /// * `transport` - HTTP access for both sitemaps and warmup requests
    pub fn new(
        config: Config,
        config_hash: Option<String>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let queue = WarmQueue::new(store, &config.storage);
        let resolver = SitemapResolver::new(Arc::clone(&transport), config.site.max_documents);
        let fetcher = Fetcher::new(transport, &config.warmup);

        Self {
            config: Arc::new(config),
            config_hash,
            queue,
            resolver,
            fetcher,
        }
    }

    /// Creates a runner with the configured store and a reqwest transport
    ///
    /// # Returns
    ///
    /// * `Ok(Runner)` - Ready to tick
    /// * `Err(WarmError)` - The store could not be opened or the client built
    pub fn from_config(config: Config, config_hash: Option<String>) -> Result<Self> {
        let store = open_store(&config.storage)?;
        let transport = Arc::new(HttpTransport::new(&config.headers, &config.warmup)?);
        Ok(Self::new(config, config_hash, store, transport))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves the configured sitemaps and filters the result
    ///
    /// Sitemap failures are logged and yield fewer (possibly zero) URLs rather
    /// than an error.
    pub async fn discover(&self) -> Result<Discovery> {
        let entries = self.config.site.sitemap_urls()?;
        let resolved = self
            .resolver
            .resolve(&entries, self.config.site.sitemap_limit)
            .await;
        let urls = filter_urls(&resolved, &self.config.filter);

        tracing::info!(
            "Discovered {} URLs ({} after filtering)",
            resolved.len(),
            urls.len()
        );

        Ok(Discovery {
            resolved: resolved.len(),
            urls,
        })
    }

    /// Runs one tick
    ///
    /// # Returns
    ///
    /// * `Ok(TickOutcome)` - What the tick did
    /// * `Err(WarmError)` - Persisted state could not be read or written
    pub async fn tick(&self) -> Result<TickOutcome> {
        let stored = self.queue.load()?;
        let state = DrainState::from_queue(stored.as_deref());
        tracing::debug!("Tick starting in state {:?}", state);

        if state.needs_rebuild() {
            let discovery = self.discover().await?;
            if discovery.urls.is_empty() {
                tracing::warn!("No URLs to warm; leaving the queue empty");
                return Ok(TickOutcome::NoUrls);
            }
            if self
                .queue
                .rebuild(&discovery.urls, self.config_hash.as_deref())?
                .is_none()
            {
                tracing::info!("Joining the queue built by a concurrent tick");
            }
        }

        let batch = match self.queue.pop_batch(self.config.warmup.batch_size)? {
            Some(batch) if !batch.urls.is_empty() => batch,
            _ => {
                // Another tick took the last batch between our load and pop
                tracing::info!("Queue drained by a concurrent tick");
                return Ok(TickOutcome::NoUrls);
            }
        };

        tracing::info!(
            "Warming {} URLs ({} left in queue)",
            batch.urls.len(),
            batch.remaining
        );
        let counts = self.fetcher.warm_batch(&batch.urls).await;
        let state = DrainState::after_pop(batch.remaining);

        // A batch finishing after the last one was popped still belongs to the
        // same run, so a finished result is added to rather than replaced
        let result = self.queue.update_result(|existing| {
            let existing = existing.unwrap_or_else(|| {
                tracing::warn!("Run result missing, starting a new one from the queue size");
                RunResult::new(batch.urls.len() + batch.remaining, Utc::now())
                    .with_config_hash(self.config_hash.as_deref())
            });
            let result = record_batch(existing, &counts);
            match state {
                DrainState::Draining { .. } => result,
                _ if result.is_finished() => result,
                _ => finalize(result, Utc::now()),
            }
        })?;

        match state {
            DrainState::Draining { remaining } => Ok(TickOutcome::Batch {
                processed: counts.processed(),
                remaining,
                next_tick_in: self.config.warmup.reschedule_delay(),
            }),
            DrainState::Completing | DrainState::Idle => {
                if !self.queue.clear_if_drained()? {
                    tracing::debug!("Queue already replaced; leaving it in place");
                }

                tracing::info!(
                    "Warmup complete: ok={} fail={} total={}",
                    result.ok,
                    result.fail,
                    result.total
                );
                Ok(TickOutcome::Completed { result })
            }
        }
    }

    /// Ticks until the run completes or there is nothing to warm
    ///
    /// Sleeps the reschedule delay between ticks, standing in for the external
    /// scheduler re-invoking the binary.
    pub async fn drain(&self) -> Result<TickOutcome> {
        let mut ticks = 0usize;
        loop {
            ticks += 1;
            match self.tick().await? {
                TickOutcome::Batch {
                    remaining,
                    next_tick_in,
                    ..
                } => {
                    tracing::debug!(
                        "Tick {} done, {} remaining, next in {:?}",
                        ticks,
                        remaining,
                        next_tick_in
                    );
                    if !next_tick_in.is_zero() {
                        tokio::time::sleep(next_tick_in).await;
                    }
                }
                outcome => {
                    tracing::info!("Drain finished after {} ticks", ticks);
                    return Ok(outcome);
                }
            }
        }
    }

    /// Drops the stored queue so the next tick rebuilds from the sitemaps
    pub fn reset(&self) -> Result<()> {
        self.queue.clear()?;
        tracing::info!("Queue cleared");
        Ok(())
    }

    pub fn status(&self) -> Result<Status> {
        Ok(Status {
            queued: self.queue.load()?.map(|urls| urls.len()),
            result: self.queue.load_result()?,
        })
    }
}
