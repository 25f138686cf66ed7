use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::capture::AudioFrame;

/// Appends raw PCM frames to a staging file in arrival order
///
/// The recorder holds the file for the life of the session and never
/// reorders or drops frames. The outbound pump owns it, so `finish` is only
/// reachable after the producing side has stopped.
pub struct FrameRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
    frames_written: u64,
}

/// A fully staged raw capture, ready for finalization
#[derive(Debug, Clone)]
pub struct StagedRecording {
    pub path: PathBuf,
    pub bytes: u64,
    pub frames: u64,
}

impl FrameRecorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create staging directory")?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create staging file: {:?}", path))?;

        info!("Staging recording to {:?}", path);

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            bytes_written: 0,
            frames_written: 0,
        })
    }

    /// Append one frame's PCM bytes
    pub fn append(&mut self, frame: &AudioFrame) -> Result<()> {
        self.writer
            .write_all(&frame.pcm)
            .context("Failed to write frame to staging file")?;
        self.bytes_written += frame.pcm.len() as u64;
        self.frames_written += 1;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and close the staging file
    pub fn finish(mut self) -> Result<StagedRecording> {
        self.writer.flush().context("Failed to flush staging file")?;

        info!(
            "Staged {} frames ({} bytes) to {:?}",
            self.frames_written, self.bytes_written, self.path
        );

        Ok(StagedRecording {
            path: self.path,
            bytes: self.bytes_written,
            frames: self.frames_written,
        })
    }
}
