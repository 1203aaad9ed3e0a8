//! Mirror downloads
//!
//! Links that fail the availability probe are copied into the download
//! directory so they can be served locally until the retention sweep removes
//! them. The flow for one URL:
//!
//! 1. HEAD for `Content-Length`; skip if it declares more than the cap
//! 2. Streaming GET into a staging file, aborting if the body passes the cap
//! 3. Flush, sync and rename the staging file to its final name
//! 4. Register the file with the [`RetentionManager`]

mod naming;
mod staged;

pub use naming::mirror_file_name;
pub use staged::{is_staging_name, staging_name, StagedFile};

use crate::retention::RetentionManager;
use crate::ScrapeError;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use url::Url;

/// Write buffer size; body chunks reach disk in blocks of this size
const CHUNK_SIZE: usize = 64 * 1024;

/// Streams unavailable links into the download directory
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    dir: PathBuf,
    max_bytes: u64,
    timeout: Duration,
    probe_timeout: Duration,
    retention: RetentionManager,
}

impl Downloader {
    /// Creates a downloader writing into the retention manager's directory
    pub fn new(
        client: Client,
        retention: RetentionManager,
        max_bytes: u64,
        timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            dir: retention.dir().to_path_buf(),
            max_bytes,
            timeout,
            probe_timeout,
            retention,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Mirrors `url` and returns the local file name, or None on any failure
    pub async fn download(&self, url: &str) -> Option<String> {
        match self.try_download(url).await {
            Ok(file_name) => Some(file_name),
            Err(e @ ScrapeError::TooLarge { .. }) => {
                info!("Skipping mirror: {}", e);
                None
            }
            Err(e) => {
                warn!("Mirror of {} failed: {}", url, e);
                None
            }
        }
    }

    /// Mirrors `url`, reporting why it failed
    ///
    /// No partial file survives an error or a dropped future.
    pub async fn try_download(&self, url: &str) -> Result<String, ScrapeError> {
        let parsed = Url::parse(url)?;

        if let Some(declared) = self.declared_length(url).await {
            self.check_size(url, declared)?;
        }

        let file_name = mirror_file_name(&parsed);
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut response = self
            .client
            .get(url)
            .timeout(self.timeout)
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

        if let Some(length) = response.content_length() {
            self.check_size(url, length)?;
        }

        let staged = StagedFile::new(self.dir.join(staging_name(&file_name)));
        let file = tokio::fs::File::create(staged.path()).await?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|e| ScrapeError::http(url, e))? {
            written += chunk.len() as u64;
            self.check_size(url, written)?;
            writer.write_all(&chunk).await?;
        }

        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_all().await?;
        drop(file);

        staged.commit(&self.dir.join(&file_name)).await?;
        self.retention.track(&file_name);

        debug!("Mirrored {} as {} ({} bytes)", url, file_name, written);
        Ok(file_name)
    }

    /// Reads `Content-Length` from a HEAD response, if the server declares one
    async fn declared_length(&self, url: &str) -> Option<u64> {
        let response = match self.client.head(url).timeout(self.probe_timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("HEAD {} for size check failed: {}", url, e);
                return None;
            }
        };

        // reqwest reports 0 for bodiless HEAD responses, so read the header
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    fn check_size(&self, url: &str, bytes: u64) -> Result<(), ScrapeError> {
        if bytes > self.max_bytes {
            return Err(ScrapeError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}
