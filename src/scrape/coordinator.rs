//! Scrape coordinator - extraction, probing and mirroring for one page
//!
//! This module ties the components together:
//! - Extracting candidate links from the page and its frames
//! - Probing every candidate with bounded concurrency
//! - Mirroring the unavailable ones with bounded concurrency
//! - Applying the overall deadline and caller cancellation

use crate::config::Config;
use crate::download::Downloader;
use crate::extract::{build_http_client, ChromiumRenderer, LinkExtractor, PageRenderer};
use crate::probe::{ProbeCache, Prober};
use crate::retention::RetentionManager;
use crate::scrape::result::{LinkStatus, OmitReason, ScrapeResult};
use crate::ScrapeError;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Finds, verifies and mirrors the audio links of web pages
///
/// One `Scraper` is meant to live for the whole process: its probe cache is
/// shared by every scrape it runs.
pub struct Scraper {
    extractor: LinkExtractor,
    prober: Prober,
    downloader: Downloader,
    max_concurrent_probes: usize,
    max_concurrent_downloads: usize,
    deadline: Duration,
}

impl Scraper {
    /// Creates a scraper that renders pages with headless Chromium
    ///
    /// Mirrors are written to the retention manager's directory and
    /// registered with it.
    pub fn new(config: &Config, retention: RetentionManager) -> Result<Self, ScrapeError> {
        let renderer = Arc::new(ChromiumRenderer::new(config.extraction.user_agent.clone()));
        Self::with_renderer(config, retention, renderer)
    }

    /// Creates a scraper with a custom render fallback
    pub fn with_renderer(
        config: &Config,
        retention: RetentionManager,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self, ScrapeError> {
        let client = build_http_client(&config.extraction)?;
        let cache = Arc::new(ProbeCache::new(
            config.limits.probe_cache_capacity,
            config.limits.probe_cache_ttl(),
        ));

        Ok(Self {
            extractor: LinkExtractor::new(client.clone(), renderer, config),
            prober: Prober::new(client.clone(), cache, config.timeouts.probe()),
            downloader: Downloader::new(
                client,
                retention,
                config.limits.max_file_size_bytes(),
                config.timeouts.download(),
                config.timeouts.probe(),
            ),
            max_concurrent_probes: config.limits.max_concurrent_probes.max(1),
            max_concurrent_downloads: config.limits.max_concurrent_downloads.max(1),
            deadline: config.timeouts.scrape_deadline(),
        })
    }

    pub fn extractor(&self) -> &LinkExtractor {
        &self.extractor
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Scrapes one page
    ///
    /// Never fails: an unreachable page or one without audio links yields an
    /// empty result.
    pub async fn scrape(&self, page_url: &str) -> ScrapeResult {
        self.scrape_with_cancel(page_url, &CancellationToken::new())
            .await
    }

    /// Scrapes one page, abandoning outstanding work once `cancel` fires or
    /// the scrape deadline passes
    ///
    /// Probes and downloads that complete before that point are kept; the
    /// rest are listed as omitted with [`OmitReason::Cancelled`].
    pub async fn scrape_with_cancel(
        &self,
        page_url: &str,
        cancel: &CancellationToken,
    ) -> ScrapeResult {
        let started = std::time::Instant::now();
        let deadline = Instant::now() + self.deadline;
        let token = cancel.child_token();

        let mut result = ScrapeResult::default();

        let Some(candidates) =
            until_stopped(&token, deadline, self.extractor.extract_links(page_url)).await
        else {
            warn!("Scrape of {} stopped during extraction", page_url);
            return result;
        };

        if candidates.is_empty() {
            info!("No audio links found on {}", page_url);
            return result;
        }

        info!("Probing {} candidate links from {}", candidates.len(), page_url);

        // Probe every candidate; all outcomes are collected before partitioning
        let token_ref = &token;
        let probes: Vec<(String, Option<bool>)> = stream::iter(candidates)
            .map(|url| async move {
                let outcome = until_stopped(token_ref, deadline, self.prober.probe(&url)).await;
                (url, outcome)
            })
            .buffer_unordered(self.max_concurrent_probes)
            .collect()
            .await;

        let mut unavailable = Vec::new();
        for (url, outcome) in probes {
            match outcome {
                Some(true) => result.insert(url, LinkStatus::Direct),
                Some(false) => unavailable.push(url),
                None => result.omit(url, OmitReason::Cancelled),
            }
        }

        let downloads: Vec<(String, Option<Result<String, ScrapeError>>)> =
            stream::iter(unavailable)
                .map(|url| async move {
                    let outcome =
                        until_stopped(token_ref, deadline, self.downloader.try_download(&url))
                            .await;
                    (url, outcome)
                })
                .buffer_unordered(self.max_concurrent_downloads)
                .collect()
                .await;

        for (url, outcome) in downloads {
            match outcome {
                Some(Ok(file_name)) => result.insert(file_name, LinkStatus::Temporary),
                Some(Err(e @ ScrapeError::TooLarge { .. })) => {
                    info!("Dropping {}: {}", url, e);
                    result.omit(url, OmitReason::TooLarge);
                }
                Some(Err(e)) => {
                    warn!("Dropping {}: {}", url, e);
                    result.omit(url, OmitReason::DownloadFailed);
                }
                None => result.omit(url, OmitReason::Cancelled),
            }
        }

        info!(
            "Scraped {} in {:?}: {} direct, {} temporary, {} omitted",
            page_url,
            started.elapsed(),
            result.count(LinkStatus::Direct),
            result.count(LinkStatus::Temporary),
            result.omitted().len()
        );

        result
    }
}

/// Runs `future` unless the token fires or the deadline passes first
async fn until_stopped<F: Future>(
    token: &CancellationToken,
    deadline: Instant,
    future: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        _ = tokio::time::sleep_until(deadline) => None,
        output = future => Some(output),
    }
}
