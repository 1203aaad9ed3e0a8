//! Echo-Sieve main entry point
//!
//! This is the command-line interface for the Echo-Sieve audio link finder.

use anyhow::{Context, Result};
use clap::Parser;
use echo_sieve::config::{load_config_with_hash, validate, Config};
use echo_sieve::extract::DisabledRenderer;
use echo_sieve::{RetentionManager, Scraper};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Echo-Sieve: finds audio links on web pages
///
/// Each page is scanned for audio-file links (including script-built and
/// framed ones). Links that can be fetched directly are reported as-is; the
/// rest are mirrored locally for a limited time.
#[derive(Parser, Debug)]
#[command(name = "echo-sieve")]
#[command(version = "1.0.0")]
#[command(about = "Finds and mirrors audio links on web pages", long_about = None)]
struct Cli {
    /// Page URLs to scrape
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Never fall back to headless rendering
    #[arg(long)]
    no_render: bool,

    /// Keep running after scraping so expired mirrors get purged, until Ctrl-C
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("loading {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            let config = Config::default();
            validate(&config).context("validating default configuration")?;
            tracing::info!("No configuration file given, using defaults");
            config
        }
    };

    let retention = RetentionManager::from_config(&config);
    let sweep = retention.start();

    let scraper = if cli.no_render {
        Scraper::with_renderer(&config, retention.clone(), Arc::new(DisabledRenderer))
    } else {
        Scraper::new(&config, retention.clone())
    }
    .context("building scraper")?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding work");
            ctrl_c_token.cancel();
        }
    });

    let base_url = config.storage.public_base_url.as_deref();
    for url in &cli.urls {
        if cancel.is_cancelled() {
            break;
        }

        let result = scraper.scrape_with_cancel(url, &cancel).await;
        for omitted in result.omitted() {
            tracing::debug!("Omitted {} ({:?})", omitted.url, omitted.reason);
        }

        let json = serde_json::to_string(&result.to_entries(base_url))
            .context("serializing scrape result")?;
        println!("{}", json);
    }

    if cli.watch && !cancel.is_cancelled() {
        tracing::info!(
            "Watching {} ({} mirrors tracked), press Ctrl-C to exit",
            retention.dir().display(),
            retention.tracked_count()
        );
        cancel.cancelled().await;
    } else if retention.tracked_count() > 0 {
        tracing::warn!(
            "Exiting with {} mirrors left in {}",
            retention.tracked_count(),
            retention.dir().display()
        );
    }

    sweep.stop().await;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the JSON results.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("echo_sieve=info,warn"),
            1 => EnvFilter::new("echo_sieve=debug,info"),
            2 => EnvFilter::new("echo_sieve=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
