//! Link extraction module
//!
//! This module turns a page URL into a set of candidate audio URLs:
//! - Plain HTTP fetch with a short timeout
//! - Headless render fallback when the fetch fails
//! - HTML parsing for media sources, anchors and script-embedded URLs
//! - Bounded recursion into embedded frames

mod fetcher;
mod parser;
mod render;

pub use fetcher::{build_http_client, fetch_page};
pub use parser::{parse_html, AudioRules, ParsedPage};
pub use render::{ChromiumRenderer, DisabledRenderer, PageRenderer};

use crate::config::Config;
use crate::url::parse_page_url;
use futures::future::{join_all, BoxFuture, FutureExt};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Collects candidate audio links from a page and the frames it embeds
pub struct LinkExtractor {
    client: Client,
    renderer: Arc<dyn PageRenderer>,
    page_timeout: Duration,
    render_timeout: Duration,
    max_frame_depth: u32,
    extension: String,
    media_type: String,
}

impl LinkExtractor {
    pub fn new(client: Client, renderer: Arc<dyn PageRenderer>, config: &Config) -> Self {
        Self {
            client,
            renderer,
            page_timeout: config.timeouts.page(),
            render_timeout: config.timeouts.render(),
            max_frame_depth: config.limits.max_frame_depth,
            extension: config.extraction.audio_extension.clone(),
            media_type: config.extraction.media_type.clone(),
        }
    }

    /// Returns the deduplicated candidate audio URLs of a page
    ///
    /// Frames are followed up to `max-frame-depth` levels and each distinct
    /// frame URL is loaded at most once. A page that can be neither fetched
    /// nor rendered contributes nothing; this never fails.
    pub async fn extract_links(&self, url: &str) -> HashSet<String> {
        let visited = Mutex::new(HashSet::new());
        let links = self.extract_frame(url.to_string(), 0, &visited).await;
        debug!(
            "Extracted {} candidate links from {} ({} documents loaded)",
            links.len(),
            url,
            visited.lock().len()
        );
        links
    }

    fn extract_frame<'a>(
        &'a self,
        url: String,
        depth: u32,
        visited: &'a Mutex<HashSet<String>>,
    ) -> BoxFuture<'a, HashSet<String>> {
        async move {
            let page_url = match parse_page_url(&url) {
                Ok(u) => u,
                Err(e) => {
                    warn!("Skipping page {}: {}", url, e);
                    return HashSet::new();
                }
            };

            if !visited.lock().insert(page_url.to_string()) {
                debug!("Already visited {}, skipping", page_url);
                return HashSet::new();
            }

            let Some(html) = self.load_html(&page_url).await else {
                return HashSet::new();
            };

            let rules = AudioRules {
                extension: &self.extension,
                media_type: &self.media_type,
            };
            let parsed = parse_html(&html, &page_url, rules);
            let mut links = parsed.audio_links;

            if parsed.frames.is_empty() {
                return links;
            }

            if depth >= self.max_frame_depth {
                debug!(
                    "Frame depth limit {} reached at {}, ignoring {} frames",
                    self.max_frame_depth,
                    page_url,
                    parsed.frames.len()
                );
                return links;
            }

            let nested = join_all(
                parsed
                    .frames
                    .into_iter()
                    .map(|frame| self.extract_frame(frame.to_string(), depth + 1, visited)),
            )
            .await;

            for frame_links in nested {
                links.extend(frame_links);
            }
            links
        }
        .boxed()
    }

    /// Fetches a page, falling back to the renderer on any fetch failure
    async fn load_html(&self, url: &Url) -> Option<String> {
        match fetch_page(&self.client, url.as_str(), self.page_timeout).await {
            Ok(html) => return Some(html),
            Err(e) => debug!("Plain fetch failed ({}), rendering {}", e, url),
        }

        match tokio::time::timeout(self.render_timeout, self.renderer.render(url.as_str())).await {
            Ok(Ok(html)) => Some(html),
            Ok(Err(e)) => {
                warn!("Could not load {}: {}", url, e);
                None
            }
            Err(_) => {
                warn!(
                    "Rendering {} exceeded {}s, giving up",
                    url,
                    self.render_timeout.as_secs()
                );
                None
            }
        }
    }
}
