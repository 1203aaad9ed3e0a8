use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like identification sent with page fetches and renders
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Main configuration structure for Echo-Sieve
///
/// Every section and key is optional; missing values fall back to the
/// documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Where mirrors live and how they are addressed
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory temporary mirrors are written to
    #[serde(rename = "download-dir")]
    pub download_dir: PathBuf,

    /// Base URL of the static-file endpoint serving `download-dir`
    #[serde(rename = "public-base-url")]
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            public_base_url: None,
        }
    }
}

/// Size, fan-out and cache limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Declared or streamed size above which a mirror is skipped (MiB)
    #[serde(rename = "max-file-size-mb")]
    pub max_file_size_mb: u64,

    /// Maximum number of probes in flight for one scrape
    #[serde(rename = "max-concurrent-probes")]
    pub max_concurrent_probes: usize,

    /// Maximum number of downloads in flight for one scrape
    #[serde(rename = "max-concurrent-downloads")]
    pub max_concurrent_downloads: usize,

    /// How many levels of nested frames are followed
    #[serde(rename = "max-frame-depth")]
    pub max_frame_depth: u32,

    /// Maximum number of unreachable URLs remembered
    #[serde(rename = "probe-cache-capacity")]
    pub probe_cache_capacity: usize,

    /// How long an unreachable URL is remembered
    #[serde(rename = "probe-cache-ttl-seconds")]
    pub probe_cache_ttl_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_concurrent_probes: 16,
            max_concurrent_downloads: 4,
            max_frame_depth: 3,
            probe_cache_capacity: 10_000,
            probe_cache_ttl_seconds: 3600,
        }
    }
}

impl LimitsConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn probe_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.probe_cache_ttl_seconds)
    }
}

/// Per-request and overall deadlines
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Plain page fetch
    #[serde(rename = "page-timeout-seconds")]
    pub page_timeout_seconds: u64,

    /// Headless render fallback
    #[serde(rename = "render-timeout-seconds")]
    pub render_timeout_seconds: u64,

    /// Each probe request (HEAD and ranged GET separately)
    #[serde(rename = "probe-timeout-seconds")]
    pub probe_timeout_seconds: u64,

    /// Full-body mirror download
    #[serde(rename = "download-timeout-seconds")]
    pub download_timeout_seconds: u64,

    /// Whole scrape call, after which outstanding work is abandoned
    #[serde(rename = "scrape-deadline-seconds")]
    pub scrape_deadline_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_timeout_seconds: 10,
            render_timeout_seconds: 15,
            probe_timeout_seconds: 5,
            download_timeout_seconds: 15,
            scrape_deadline_seconds: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn page(&self) -> Duration {
        Duration::from_secs(self.page_timeout_seconds)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_timeout_seconds)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds)
    }

    pub fn scrape_deadline(&self) -> Duration {
        Duration::from_secs(self.scrape_deadline_seconds)
    }
}

/// Retention sweep cadence and mirror lifetime
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    #[serde(rename = "interval-seconds")]
    pub interval_seconds: u64,

    #[serde(rename = "ttl-seconds")]
    pub ttl_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            ttl_seconds: 300,
        }
    }
}

impl RetentionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// What counts as an audio link
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// File extension matched on link paths, without the dot
    #[serde(rename = "audio-extension")]
    pub audio_extension: String,

    /// `type` attribute of `<source>` elements treated as audio
    #[serde(rename = "media-type")]
    pub media_type: String,

    /// User-Agent sent with page fetches and renders
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            audio_extension: "mp3".to_string(),
            media_type: "audio/mpeg".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
