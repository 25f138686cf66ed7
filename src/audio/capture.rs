use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Bytes per sample (16-bit PCM)
pub const BYTES_PER_SAMPLE: usize = 2;

/// One fixed-size frame of captured PCM audio
///
/// Frames fan out to the staging recorder and the outbound pump; each
/// consumer gets its own copy, nothing is mutated after capture.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Monotonic frame counter, assigned at capture
    pub sequence: u64,
    /// Raw little-endian 16-bit PCM bytes
    pub pcm: Vec<u8>,
    /// Wall-clock time the frame was completed
    pub captured_at: DateTime<Utc>,
}

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Capacity of the bounded frame queue between the device callback and
    /// the outbound pump
    pub queue_frames: usize,
}

impl CaptureConfig {
    /// Bytes in one frame: roughly 100ms of audio
    pub fn frame_bytes(&self) -> usize {
        self.sample_rate as usize * BYTES_PER_SAMPLE * self.channels as usize / 10
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            queue_frames: 64,
        }
    }
}

/// Audio capture backend trait
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Start capturing audio
    ///
    /// Returns the receiving end of the bounded frame queue.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    /// Frames dropped because the queue was full
    fn dropped_frames(&self) -> u64;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Default-input-device capture via cpal
///
/// The cpal stream lives on a dedicated thread because it is not `Send`.
/// The device callback never blocks on downstream state: completed frames
/// go into the queue with `try_send`, and when the queue is full the newest
/// frame is dropped and counted.
pub struct CpalCapture {
    config: CaptureConfig,
    dropped: Arc<AtomicU64>,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CpalCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            dropped: Arc::new(AtomicU64::new(0)),
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for CpalCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            anyhow::bail!("Capture already started");
        }

        let (frame_tx, frame_rx) = mpsc::channel(self.config.queue_frames);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let config = self.config.clone();
        let dropped = Arc::clone(&self.dropped);
        let capturing = Arc::clone(&self.capturing);

        let thread = std::thread::spawn(move || {
            run_device(config, frame_tx, dropped, capturing, ready_tx, stop_rx);
        });

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        ready_rx
            .await
            .context("Capture thread exited before reporting readiness")??;

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked");
            }
        }
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!("Capture dropped {} frames on queue overflow", dropped);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

/// Accumulates device callback buffers into fixed-size frames and enqueues
/// them without blocking the realtime callback
struct FrameAssembler {
    frame_bytes: usize,
    pending: Vec<u8>,
    sequence: u64,
    tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameAssembler {
    fn new(frame_bytes: usize, tx: mpsc::Sender<AudioFrame>, dropped: Arc<AtomicU64>) -> Self {
        Self {
            frame_bytes,
            pending: Vec::with_capacity(frame_bytes * 2),
            sequence: 0,
            tx,
            dropped,
        }
    }

    fn push(&mut self, samples: impl Iterator<Item = i16>) {
        for sample in samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }
        while self.pending.len() >= self.frame_bytes {
            let rest = self.pending.split_off(self.frame_bytes);
            let pcm = std::mem::replace(&mut self.pending, rest);
            let frame = AudioFrame {
                sequence: self.sequence,
                pcm,
                captured_at: Utc::now(),
            };
            self.sequence += 1;
            match self.tx.try_send(frame) {
                Ok(()) => {}
                // overflow policy: drop the newest frame, count it
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                // consumer is gone; the session is shutting down
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

fn run_device(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
    capturing: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<()>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let stream = match build_stream(&config, frame_tx, dropped) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow::anyhow!("Failed to start input stream: {}", e)));
        return;
    }

    capturing.store(true, Ordering::SeqCst);
    let _ = ready_tx.send(Ok(()));

    // Park until stopped; the stream stays alive while this thread holds it
    let _ = stop_rx.recv();

    drop(stream);
    capturing.store(false, Ordering::SeqCst);
    info!("Audio capture stopped");
}

fn build_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;

    info!(
        "Capturing from device: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let sample_format = device
        .default_input_config()
        .context("Failed to query input device config")?
        .sample_format();

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut assembler = FrameAssembler::new(config.frame_bytes(), frame_tx, dropped);
    let err_fn = |err| error!("Audio input stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                assembler.push(data.iter().copied());
            },
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                assembler.push(
                    data.iter()
                        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                );
            },
            err_fn,
            None,
        )?,
        other => anyhow::bail!("Unsupported input sample format: {:?}", other),
    };

    Ok(stream)
}
