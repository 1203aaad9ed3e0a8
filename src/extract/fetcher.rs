//! HTTP fetcher implementation
//!
//! This module handles the plain (non-rendering) side of page retrieval:
//! - Building the shared HTTP client with a browser-like user agent
//! - GET requests for page content under a short timeout
//! - Classifying failures so the caller can fall back to rendering

use crate::config::ExtractionConfig;
use crate::ScrapeError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops followed by any request
const MAX_REDIRECTS: usize = 10;

/// Builds the HTTP client shared by the extractor, prober and downloader
///
/// No overall timeout is set on the client: each call site applies its own
/// per-request deadline.
///
/// # Example
///
/// ```no_run
/// use echo_sieve::config::ExtractionConfig;
/// use echo_sieve::extract::build_http_client;
///
/// let client = build_http_client(&ExtractionConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ExtractionConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page body with a plain GET request
///
/// # Returns
///
/// * `Ok(String)` - The page body of a 2xx response
/// * `Err(ScrapeError::Timeout)` - The request exceeded `timeout`
/// * `Err(ScrapeError::Status)` - The server answered with a non-success status
/// * `Err(ScrapeError::Http)` - Any other transport failure
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Result<String, ScrapeError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ScrapeError::http(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| ScrapeError::http(url, e))
}
