//! Headless render fallback
//!
//! When a plain fetch fails, the page is loaded in a script engine so links
//! injected by client-side code end up in the DOM we parse.

use crate::ScrapeError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;

/// Produces the post-script HTML of a page
///
/// Implementations should not apply their own overall timeout; the extractor
/// wraps every call in `render-timeout-seconds`.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Renders pages in a headless Chromium launched per call
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    user_agent: String,
}

impl ChromiumRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

fn render_error(url: &str, error: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Render {
        url: url.to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String, ScrapeError> {
        let config = BrowserConfig::builder()
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(|e| render_error(url, e))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| render_error(url, e))?;

        // The CDP connection only makes progress while the handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let content = async {
            let page = browser.new_page(url).await?;
            page.wait_for_navigation().await?;
            page.content().await
        }
        .await;

        if let Err(e) = browser.close().await {
            tracing::debug!("Failed to close browser after rendering {}: {}", url, e);
        }
        handler_task.abort();

        content.map_err(|e| render_error(url, e))
    }
}

/// Renderer used when no script engine is available; every render fails
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

#[async_trait]
impl PageRenderer for DisabledRenderer {
    async fn render(&self, url: &str) -> Result<String, ScrapeError> {
        Err(render_error(url, "rendering is disabled"))
    }
}
