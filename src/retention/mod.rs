//! Retention of mirrored files
//!
//! Every mirror written by the downloader is tracked here with its creation
//! time. A background sweep, owned through a [`RetentionHandle`], deletes the
//! ones older than the TTL. Tracking lives in memory only: mirrors written
//! before a restart are never purged by this mechanism.

use crate::config::Config;
use crate::download::is_staging_name;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tracks mirrored files and purges them once expired
///
/// Cheap to clone; clones share the same tracking table.
#[derive(Clone, Debug)]
pub struct RetentionManager {
    inner: Arc<RetentionInner>,
}

#[derive(Debug)]
struct RetentionInner {
    dir: PathBuf,
    interval: Duration,
    ttl: ChronoDuration,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl RetentionManager {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RetentionInner {
                dir: dir.into(),
                interval,
                ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::days(36_500)),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.storage.download_dir.clone(),
            config.retention.interval(),
            config.retention.ttl(),
        )
    }

    /// Directory the tracked files live in
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Starts tracking `file_name`, created now
    pub fn track(&self, file_name: &str) {
        self.track_at(file_name, Utc::now());
    }

    /// Starts tracking `file_name` with an explicit creation time
    ///
    /// Re-tracking a name resets its age.
    pub fn track_at(&self, file_name: &str, created_at: DateTime<Utc>) {
        self.inner
            .entries
            .lock()
            .insert(file_name.to_string(), created_at);
    }

    pub fn is_tracked(&self, file_name: &str) -> bool {
        self.inner.entries.lock().contains_key(file_name)
    }

    pub fn tracked_count(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Deletes every tracked file older than the TTL
    ///
    /// Returns the number of entries dropped from tracking.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    /// Like [`sweep`](Self::sweep), measuring ages against `now`
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<(String, DateTime<Utc>)> = {
            let entries = self.inner.entries.lock();
            entries
                .iter()
                .filter(|(_, created)| now - **created > self.inner.ttl)
                .map(|(name, created)| (name.clone(), *created))
                .collect()
        };

        let mut removed = 0;
        for (name, created) in expired {
            let path = self.inner.dir.join(&name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Deleted expired mirror {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Expired mirror {} already gone", path.display())
                }
                Err(e) => {
                    // Stay tracked so the next sweep retries
                    warn!("Failed to delete expired mirror {}: {}", path.display(), e);
                    continue;
                }
            }

            let mut entries = self.inner.entries.lock();
            // A download may have re-tracked the name while we were deleting
            if entries.get(&name) == Some(&created) {
                entries.remove(&name);
                removed += 1;
            }
        }

        removed
    }

    /// Removes staging files left behind by an interrupted process
    ///
    /// Returns the number of files removed. A missing directory counts as
    /// nothing to clean.
    pub async fn purge_staging_files(&self) -> usize {
        let mut dir = match tokio::fs::read_dir(&self.inner.dir).await {
            Ok(d) => d,
            Err(e) => {
                debug!(
                    "Not scanning {} for staging files: {}",
                    self.inner.dir.display(),
                    e
                );
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error scanning {}: {}", self.inner.dir.display(), e);
                    break;
                }
            };

            let name = entry.file_name();
            if !is_staging_name(&name.to_string_lossy()) {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove stale {}: {}", entry.path().display(), e),
            }
        }
        removed
    }

    /// Spawns the sweep loop on the current tokio runtime
    ///
    /// The loop first clears stale staging files, then sweeps once per
    /// interval until the returned handle is stopped.
    pub fn start(&self) -> RetentionHandle {
        let token = CancellationToken::new();
        let manager = self.clone();
        let loop_token = token.clone();

        let task = tokio::spawn(async move {
            let stale = manager.purge_staging_files().await;
            if stale > 0 {
                info!("Removed {} stale staging files", stale);
            }

            let interval = manager.inner.interval;
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = manager.sweep().await;
                        if removed > 0 {
                            info!(
                                "Retention sweep removed {} mirrors, {} still tracked",
                                removed,
                                manager.tracked_count()
                            );
                        }
                    }
                }
            }

            debug!("Retention sweep stopped");
        });

        RetentionHandle { token, task }
    }
}

/// Owns the running sweep loop
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the loop
/// running until the runtime shuts down.
#[derive(Debug)]
pub struct RetentionHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RetentionHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the loop and waits for it to exit
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!("Retention sweep task ended abnormally: {}", e);
        }
    }
}
