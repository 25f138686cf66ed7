use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::audio::{StagedRecording, BYTES_PER_SAMPLE};

/// Output format of the finalized container
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// A finalized, playable recording
#[derive(Debug, Clone)]
pub struct FinalizedRecording {
    pub path: PathBuf,
    pub data_bytes: u64,
    pub duration_seconds: f64,
}

/// Converts a staged raw capture into a standard WAV container
///
/// Every header field is computed from the staged byte count before any
/// output is written; the writer streams header-then-payload and never
/// seeks back to patch sizes.
pub struct RecordingFinalizer {
    spec: WavSpec,
}

impl RecordingFinalizer {
    pub fn new(spec: WavSpec) -> Self {
        Self { spec }
    }

    pub fn finalize(&self, staged: &StagedRecording, out_path: &Path) -> Result<FinalizedRecording> {
        let data_bytes = fs::metadata(&staged.path)
            .with_context(|| format!("Failed to stat staged recording: {:?}", staged.path))?
            .len();

        let mut input = BufReader::new(
            File::open(&staged.path)
                .with_context(|| format!("Failed to open staged recording: {:?}", staged.path))?,
        );
        let mut output = BufWriter::new(
            File::create(out_path)
                .with_context(|| format!("Failed to create recording: {:?}", out_path))?,
        );

        write_wav_header(&mut output, &self.spec, data_bytes)
            .context("Failed to write container header")?;
        io::copy(&mut input, &mut output).context("Failed to copy staged audio")?;
        output.flush().context("Failed to flush recording")?;

        let bytes_per_second =
            self.spec.sample_rate as u64 * self.spec.channels as u64 * BYTES_PER_SAMPLE as u64;
        let duration_seconds = data_bytes as f64 / bytes_per_second as f64;

        info!(
            "Finalized recording {:?}: {} data bytes, {:.1}s",
            out_path, data_bytes, duration_seconds
        );

        Ok(FinalizedRecording {
            path: out_path.to_path_buf(),
            data_bytes,
            duration_seconds,
        })
    }
}

/// RIFF / fmt / data header, 44 bytes, fields little-endian in container order
fn write_wav_header(out: &mut impl Write, spec: &WavSpec, data_bytes: u64) -> io::Result<()> {
    let bytes_per_frame = u32::from(spec.channels) * u32::from(spec.bits_per_sample) / 8;
    let byte_rate = spec.sample_rate * bytes_per_frame;
    let data_len = data_bytes as u32;

    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_len).to_le_bytes())?;
    out.write_all(b"WAVE")?;

    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?; // PCM
    out.write_all(&spec.channels.to_le_bytes())?;
    out.write_all(&spec.sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&(bytes_per_frame as u16).to_le_bytes())?; // block align
    out.write_all(&spec.bits_per_sample.to_le_bytes())?;

    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;

    Ok(())
}
