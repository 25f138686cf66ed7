use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Durable home for finalized recordings
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Publish the file under `file_name`; returns the stored location
    async fn publish(&self, path: &Path, file_name: &str) -> Result<String>;
}

/// Filesystem-backed recording store
///
/// Copies recordings into a configured directory. `url_prefix` forms the
/// advertised location; when empty, the destination path itself is
/// advertised.
pub struct FsRecordingStore {
    root: PathBuf,
    url_prefix: String,
}

impl FsRecordingStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }
}

#[async_trait]
impl RecordingStore for FsRecordingStore {
    async fn publish(&self, path: &Path, file_name: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to create recordings directory")?;

        let dest = self.root.join(file_name);
        tokio::fs::copy(path, &dest)
            .await
            .with_context(|| format!("Failed to publish recording to {:?}", dest))?;

        info!("Recording published to {:?}", dest);

        let url = if self.url_prefix.is_empty() {
            dest.display().to_string()
        } else {
            format!("{}/{}", self.url_prefix.trim_end_matches('/'), file_name)
        };
        Ok(url)
    }
}
