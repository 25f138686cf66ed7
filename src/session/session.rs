use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::notes::MeetingNotes;
use super::signals::MeetingSignal;
use super::state::{SessionState, StateCell};
use crate::audio::{AudioFrame, FrameRecorder, StagedRecording};
use crate::bus::BusClient;
use crate::protocol;
use crate::recording::{RecordingFinalizer, RecordingStore, WavSpec};
use crate::transcribe::{
    classify, ChannelError, EndpointResolver, InboundEvent, MessageSink, MessageSource, WsChannel,
};

/// How often pump loops re-check the stop flag while blocked
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Summary returned to the driver once the session is closed
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub call_id: String,
    pub captions: usize,
    pub frames_sent: u64,
    pub recording_url: Option<String>,
}

/// A live transcription session
///
/// Owns the state machine and the two pumps that run for the duration of
/// streaming. Termination is cooperative: both pumps observe a shared stop
/// flag at their loop boundaries, set by the end signal, the hard deadline,
/// or a pump that lost the connection.
pub struct StreamingSession {
    config: SessionConfig,
    bus: Arc<BusClient>,
    notes: Arc<Mutex<MeetingNotes>>,
    state: Arc<StateCell>,
    stop: Arc<AtomicBool>,
    frames_sent: Arc<AtomicU64>,
}

impl StreamingSession {
    pub fn new(config: SessionConfig, bus: Arc<BusClient>) -> Self {
        Self {
            config,
            bus,
            notes: Arc::new(Mutex::new(MeetingNotes::new())),
            state: Arc::new(StateCell::new()),
            stop: Arc::new(AtomicBool::new(false)),
            frames_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.config.call_id
    }

    /// Shared handle to the session state
    pub fn state_cell(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Shared handle to the meeting notes
    pub fn notes_handle(&self) -> Arc<Mutex<MeetingNotes>> {
        Arc::clone(&self.notes)
    }

    /// Resolve the endpoint and open the duplex channel
    ///
    /// Failure here is fatal to session start and is reported to the
    /// caller; the session moves straight to `Closed` and never streams.
    pub async fn connect(
        &self,
        resolver: &dyn EndpointResolver,
    ) -> Result<(Box<dyn MessageSink>, Box<dyn MessageSource>)> {
        self.state.advance(SessionState::Connecting);

        let settings = self.config.stream_settings();
        let connected = async {
            let endpoint = resolver
                .resolve(&settings)
                .await
                .context("Failed to resolve streaming endpoint")?;
            WsChannel::connect(&endpoint.url, &endpoint.headers)
                .await
                .context("Failed to open transcription channel")
        }
        .await;

        match connected {
            Ok(halves) => Ok(halves),
            Err(e) => {
                self.state.advance(SessionState::Closed);
                Err(e)
            }
        }
    }

    /// Run the session to completion
    ///
    /// Drives both pumps and the signal loop, then drains: pumps exit, the
    /// staging recorder is closed, END is published, and the recording is
    /// finalized and announced. Record ordering is START, then segments,
    /// then END, then ADD_RECORDING_URL.
    pub async fn run(
        &self,
        sink: Box<dyn MessageSink>,
        source: Box<dyn MessageSource>,
        audio_rx: mpsc::Receiver<AudioFrame>,
        recorder: FrameRecorder,
        signal_rx: mpsc::Receiver<MeetingSignal>,
        store: &dyn RecordingStore,
    ) -> Result<SessionSummary> {
        if let Err(e) = self.bus.publish_start().await {
            error!("Failed to publish lifecycle start record: {}", e);
        }

        self.state.advance(SessionState::Streaming);
        info!("Session {} streaming", self.config.call_id);

        let outbound = self.spawn_outbound(sink, audio_rx, recorder);
        let inbound = self.spawn_inbound(source);

        self.signal_loop(signal_rx).await;

        self.state.advance(SessionState::Draining);
        self.stop.store(true, Ordering::SeqCst);

        let staged = match outbound.await {
            Ok(Ok(staged)) => Some(staged),
            Ok(Err(e)) => {
                error!("Outbound pump failed: {}", e);
                None
            }
            Err(e) => {
                error!("Outbound pump panicked: {}", e);
                None
            }
        };
        if let Err(e) = inbound.await {
            error!("Inbound pump panicked: {}", e);
        }

        self.state.advance(SessionState::Closed);
        if let Err(e) = self.bus.publish_end().await {
            error!("Failed to publish lifecycle end record: {}", e);
        }

        let recording_url = match staged {
            Some(staged) => self.finalize_recording(staged, store).await,
            None => None,
        };

        let captions = self.notes.lock().await.caption_count();
        info!("Session {} closed ({} captions)", self.config.call_id, captions);

        Ok(SessionSummary {
            call_id: self.config.call_id.clone(),
            captions,
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            recording_url,
        })
    }

    /// Outbound pump: capture queue → staging recorder → wire → service
    fn spawn_outbound(
        &self,
        mut sink: Box<dyn MessageSink>,
        mut audio_rx: mpsc::Receiver<AudioFrame>,
        mut recorder: FrameRecorder,
    ) -> JoinHandle<Result<StagedRecording>> {
        let stop = Arc::clone(&self.stop);
        let frames_sent = Arc::clone(&self.frames_sent);

        tokio::spawn(async move {
            info!("Outbound pump started");

            while !stop.load(Ordering::SeqCst) {
                let frame = match timeout(POLL_INTERVAL, audio_rx.recv()).await {
                    Err(_) => continue, // re-check the stop flag
                    Ok(None) => break,  // capture side closed the queue
                    Ok(Some(frame)) => frame,
                };

                if let Err(e) = recorder.append(&frame) {
                    error!("Failed to stage frame {}: {}", frame.sequence, e);
                    stop.store(true, Ordering::SeqCst);
                    break;
                }

                if frame.pcm.is_empty() {
                    continue;
                }

                let encoded = match protocol::audio_event(&frame.pcm) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Failed to encode audio frame: {}", e);
                        continue;
                    }
                };

                match sink.send(encoded).await {
                    Ok(()) => {
                        frames_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(ChannelError::Closed) => {
                        info!("Transcription channel closed while sending");
                        stop.store(true, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => {
                        error!("Failed to send audio frame: {}", e);
                        stop.store(true, Ordering::SeqCst);
                        break;
                    }
                }

                // let the inbound pump interleave
                tokio::task::yield_now().await;
            }

            if let Err(e) = sink.close().await {
                warn!("Failed to close transcription channel: {}", e);
            }

            let staged = recorder.finish()?;
            info!("Outbound pump stopped");
            Ok(staged)
        })
    }

    /// Inbound pump: wire → decode → classify → reconcile → emit
    fn spawn_inbound(&self, mut source: Box<dyn MessageSource>) -> JoinHandle<()> {
        let stop = Arc::clone(&self.stop);
        let notes = Arc::clone(&self.notes);
        let bus = Arc::clone(&self.bus);

        tokio::spawn(async move {
            info!("Inbound pump started");

            while !stop.load(Ordering::SeqCst) {
                let received = match timeout(POLL_INTERVAL, source.recv()).await {
                    Err(_) => continue, // re-check the stop flag
                    Ok(received) => received,
                };

                let bytes = match received {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => {
                        // closed by peer: not fatal, just ends this pump
                        info!("Transcription service closed the channel");
                        stop.store(true, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => {
                        error!("Transcription channel receive failed: {}", e);
                        stop.store(true, Ordering::SeqCst);
                        break;
                    }
                };

                let message = match protocol::decode(&bytes) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Dropping inbound message: {}", e);
                        continue;
                    }
                };

                match classify(&message) {
                    Ok(InboundEvent::Transcript(results)) => {
                        for result in results {
                            if result.transcript.is_empty() {
                                continue;
                            }
                            let applied = {
                                let mut notes = notes.lock().await;
                                notes.apply_result(&result)
                            };
                            if let Some(speaker) = applied.speaker() {
                                if let Err(e) =
                                    bus.publish_transcript_segment(&result, speaker).await
                                {
                                    error!("Failed to publish transcript segment: {}", e);
                                }
                            }
                        }
                    }
                    Ok(InboundEvent::Exception { message }) => {
                        warn!("Transcription service exception: {}", message);
                    }
                    Ok(InboundEvent::Other { event_type }) => {
                        debug!("Ignoring {} event", event_type);
                    }
                    Err(e) => {
                        warn!("Dropping unclassifiable message: {}", e);
                    }
                }

                tokio::task::yield_now().await;
            }

            info!("Inbound pump stopped");
        })
    }

    /// Apply external signals until the meeting ends, a pump stops the
    /// session, or the hard deadline expires
    async fn signal_loop(&self, mut signal_rx: mpsc::Receiver<MeetingSignal>) {
        let deadline = tokio::time::sleep(self.config.max_duration);
        tokio::pin!(deadline);
        let mut poll = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        "Session {} reached the maximum duration; draining",
                        self.config.call_id
                    );
                    break;
                }
                _ = poll.tick() => {
                    if self.stop.load(Ordering::SeqCst) {
                        break;
                    }
                }
                signal = signal_rx.recv() => match signal {
                    None => break, // control surface went away; treat as end
                    Some(MeetingSignal::End) => {
                        info!("End signal received for {}", self.config.call_id);
                        break;
                    }
                    Some(MeetingSignal::SpeakerChange { name }) => {
                        debug!("Speaker changed: {}", name);
                        self.notes.lock().await.set_speaker(&name);
                    }
                    Some(MeetingSignal::ChatMessage { text }) => {
                        self.notes.lock().await.add_message(&text);
                    }
                },
            }
        }
    }

    /// Finalize the staged capture and announce its location
    ///
    /// Failures here are logged and swallowed; the publish steps run under
    /// the teardown deadline.
    async fn finalize_recording(
        &self,
        staged: StagedRecording,
        store: &dyn RecordingStore,
    ) -> Option<String> {
        let spec = WavSpec {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            bits_per_sample: 16,
        };
        let wav_path = staged.path.with_extension("wav");

        let finalized = match RecordingFinalizer::new(spec).finalize(&staged, &wav_path) {
            Ok(finalized) => finalized,
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                return None;
            }
        };

        let file_name = format!("{}.wav", self.config.call_id);
        let url = match timeout(
            self.config.teardown_timeout,
            store.publish(&finalized.path, &file_name),
        )
        .await
        {
            Err(_) => {
                error!("Recording publish timed out");
                return None;
            }
            Ok(Err(e)) => {
                error!("Failed to publish recording: {}", e);
                return None;
            }
            Ok(Ok(url)) => url,
        };

        match timeout(
            self.config.teardown_timeout,
            self.bus.publish_recording_url(&url),
        )
        .await
        {
            Err(_) => error!("Recording url record publish timed out"),
            Ok(Err(e)) => error!("Failed to publish recording url record: {}", e),
            Ok(Ok(())) => {}
        }

        Some(url)
    }
}
