//! cache-warmer main entry point
//!
//! This is the command-line interface for the scheduled sitemap cache warmer.
//! By default each invocation runs exactly one tick and exits; an external
//! scheduler re-invokes it until the run completes.

use anyhow::Context;
use cache_warmer::config::{load_config_with_hash, Config};
use cache_warmer::output::{format_outcome, print_status};
use cache_warmer::purge::PurgeClient;
use cache_warmer::schedule::Schedule;
use cache_warmer::storage::MemoryStore;
use cache_warmer::warmer::HttpTransport;
use cache_warmer::{Runner, TickOutcome};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// cache-warmer: keeps a CDN cache populated from a site's sitemaps
///
/// Discovers page URLs from the sitemap hierarchy, filters out uncacheable
/// ones, and requests them in resumable batches.
#[derive(Parser, Debug)]
#[command(name = "cache-warmer")]
#[command(version = "1.0.0")]
#[command(about = "Scheduled sitemap cache warmer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run ticks back to back until the queue is drained
    #[arg(long, group = "mode")]
    drain: bool,

    /// Show the persisted queue and run result and exit
    #[arg(long, group = "mode")]
    status: bool,

    /// Discover and filter URLs without queueing or warming anything
    #[arg(long, group = "mode")]
    dry_run: bool,

    /// Drop the stored queue so the next tick starts a new run
    #[arg(long, group = "mode")]
    reset: bool,

    /// Purge the whole CDN zone and exit
    #[arg(long, group = "mode")]
    purge: bool,

    /// Print the next scheduled start and the matching crontab line
    #[arg(long, group = "mode")]
    next_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.next_run {
        handle_next_run(&config)?;
    } else if cli.purge {
        handle_purge(&config).await?;
    } else if cli.dry_run {
        handle_dry_run(config).await?;
    } else {
        let runner = Runner::from_config(config, Some(config_hash))
            .context("failed to initialize runner")?;

        if cli.status {
            print_status(&runner.status()?);
        } else if cli.reset {
            runner.reset()?;
            println!("Queue cleared; the next tick rebuilds it from the sitemaps");
        } else if cli.drain {
            handle_tick(runner.drain().await)?;
        } else {
            handle_tick(runner.tick().await)?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cache_warmer=info,warn"),
            1 => EnvFilter::new("cache_warmer=debug,info"),
            2 => EnvFilter::new("cache_warmer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn handle_tick(outcome: cache_warmer::Result<TickOutcome>) -> anyhow::Result<()> {
    match outcome {
        Ok(outcome) => {
            println!("{}", format_outcome(&outcome));
            Ok(())
        }
        Err(e) => {
            tracing::error!("Tick failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --dry-run mode: shows what the next rebuild would queue
///
/// Runs discovery against a throwaway in-memory store so persisted state is
/// never touched.
async fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    let transport = HttpTransport::new(&config.headers, &config.warmup)?;
    let runner = Runner::new(config, None, Arc::new(MemoryStore::new()), Arc::new(transport));
    let config = runner.config();
    println!("=== Cache Warmer Dry Run ===\n");

    println!("Site: {}", config.site.root);
    println!("Sitemaps:");
    for sitemap in config.site.sitemap_urls()? {
        println!("  - {}", sitemap);
    }

    println!("\nWarmup:");
    println!("  Batch size: {}", config.warmup.batch_size);
    println!("  Concurrency: {} ({:?})", config.warmup.concurrency, config.warmup.mode);
    println!("  Timeout: {}s", config.warmup.timeout_secs);
    println!("  Max retry: {}", config.warmup.max_retry);

    let discovery = runner.discover().await?;
    let batches = discovery.urls.len().div_ceil(config.warmup.batch_size);

    println!("\nDiscovery:");
    println!("  Resolved from sitemaps: {}", discovery.resolved);
    println!("  Cacheable after filtering: {}", discovery.urls.len());
    println!("  Ticks needed: {}", batches);

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --next-run mode
fn handle_next_run(config: &Config) -> anyhow::Result<()> {
    let schedule = Schedule::from_config(&config.schedule)?;
    let next = schedule.next_run_after(Utc::now());

    println!("Schedule: {}", schedule);
    println!("Next run: {}", next.to_rfc3339());
    println!("Crontab (UTC): {}", schedule.cron_expression());
    Ok(())
}

/// Handles the --purge mode
async fn handle_purge(config: &Config) -> anyhow::Result<()> {
    let purge = config
        .purge
        .as_ref()
        .context("no [purge] section in configuration")?;
    let client = PurgeClient::from_env(purge)?;

    let outcome = client.purge_everything().await;
    if outcome.success {
        println!("✓ Cache purged ({} attempt(s))", outcome.attempts);
        Ok(())
    } else {
        anyhow::bail!(
            "purge failed after {} attempts (last status: {:?})",
            outcome.attempts,
            outcome.status
        )
    }
}
