//! Echo-Sieve: an audio link finder and short-lived mirror
//!
//! This crate locates audio-file links on a web page (including links that only
//! appear after script execution, inside embedded JSON, or in nested frames),
//! checks whether each one is directly fetchable, and mirrors the ones that are
//! not into a local directory that is purged after a retention window.

pub mod config;
pub mod download;
pub mod extract;
pub mod probe;
pub mod retention;
pub mod scrape;
pub mod url;

use thiserror::Error;

/// Main error type for Echo-Sieve operations
///
/// Most of these never reach a caller of [`scrape::Scraper::scrape`]: each
/// component degrades a failure into an omission and logs it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Render failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("{url} exceeds the size limit of {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("Bad URL: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Wraps a reqwest error with the URL it was raised for
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Errors raised while loading `echo-sieve.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Unparseable URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    InvalidScheme(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

pub use config::Config;
pub use retention::{RetentionHandle, RetentionManager};
pub use scrape::{LinkStatus, ScrapeResult, Scraper};
