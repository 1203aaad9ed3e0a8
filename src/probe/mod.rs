//! Availability probing
//!
//! Decides whether a candidate URL can be handed to a downstream client as-is:
//! 1. Known failures (see [`ProbeCache`]) are rejected without a request
//! 2. HEAD, following redirects; any 2xx means available
//! 3. Otherwise a ranged GET for the first KiB; 200 or 206 means available
//! 4. Anything else marks the URL unavailable and caches the failure

mod cache;

pub use cache::ProbeCache;

use crate::ScrapeError;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Byte range requested when HEAD is rejected
const PROBE_RANGE: &str = "bytes=0-1024";

/// Checks direct availability of candidate links
#[derive(Clone)]
pub struct Prober {
    client: Client,
    cache: Arc<ProbeCache>,
    timeout: Duration,
}

impl Prober {
    pub fn new(client: Client, cache: Arc<ProbeCache>, timeout: Duration) -> Self {
        Self {
            client,
            cache,
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<ProbeCache> {
        &self.cache
    }

    /// Returns true if `url` is directly fetchable
    ///
    /// Never fails: every error is an unavailable verdict.
    pub async fn probe(&self, url: &str) -> bool {
        if self.cache.contains(url) {
            debug!("Probe skipped for cached failure {}", url);
            return false;
        }

        match self.check(url).await {
            Ok(()) => {
                debug!("Probe succeeded for {}", url);
                true
            }
            Err(e) => {
                debug!("Probe failed for {}: {}", url, e);
                self.cache.insert(url);
                false
            }
        }
    }

    async fn check(&self, url: &str) -> Result<(), ScrapeError> {
        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!(
                "HEAD {} returned {}, trying ranged GET",
                url,
                response.status()
            ),
            Err(e) => debug!("HEAD {} failed ({}), trying ranged GET", url, e),
        }

        let response = self
            .client
            .get(url)
            .header(RANGE, PROBE_RANGE)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ScrapeError::http(url, e))?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => Ok(()),
            status => Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
