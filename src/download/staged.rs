//! Staging files for in-progress downloads
//!
//! A download writes to `.<name>.<n>.part` and is renamed into place only
//! once complete. Dropping an uncommitted [`StagedFile`] removes the partial
//! file, so errors, size-cap aborts and cancelled futures all clean up.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix of every staging file
pub const STAGING_SUFFIX: &str = ".part";

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns a staging file name for `file_name`, unique within the process
pub fn staging_name(file_name: &str) -> String {
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{}.{}{}", file_name, n, STAGING_SUFFIX)
}

/// Checks whether a directory entry name looks like a staging file
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// Scoped ownership of a partially written file
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically moves the staged file to `destination`
    ///
    /// On failure the staged file is still removed when `self` drops.
    pub async fn commit(mut self, destination: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, destination).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed partial file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove partial file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
