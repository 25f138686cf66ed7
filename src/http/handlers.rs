use super::state::{AppState, SessionHandle};
use crate::audio::{AudioCapture, CaptureConfig, CpalCapture, FrameRecorder};
use crate::bus::{BusClient, NatsTransport};
use crate::recording::FsRecordingStore;
use crate::session::{
    derive_call_id, MeetingSignal, SessionConfig, SessionState, StreamingSession,
};
use crate::transcribe::StaticEndpointResolver;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartMeetingRequest {
    /// Optional meeting ID (if not provided, generate UUID)
    pub meeting_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartMeetingResponse {
    pub meeting_id: String,
    pub call_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MeetingStatus {
    pub meeting_id: String,
    pub call_id: String,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub captions: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn meeting_not_found(meeting_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Meeting {} not found", meeting_id),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /meetings/start
/// Start a new scribe session
pub async fn start_meeting(
    State(state): State<AppState>,
    Json(req): Json<StartMeetingRequest>,
) -> impl IntoResponse {
    // Generate or use provided meeting ID
    let meeting_id = req
        .meeting_id
        .unwrap_or_else(|| format!("meeting-{}", uuid::Uuid::new_v4()));

    info!("Starting scribe session for meeting: {}", meeting_id);

    // Check if the meeting is already being scribed
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&meeting_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Meeting {} already has a session", meeting_id),
                }),
            )
                .into_response();
        }
    }

    match launch_session(&state, &meeting_id).await {
        Ok(handle) => {
            let call_id = handle.call_id.clone();
            {
                let mut sessions = state.sessions.write().await;
                sessions.insert(meeting_id.clone(), handle);
            }

            info!("Session started for meeting: {}", meeting_id);

            (
                StatusCode::OK,
                Json(StartMeetingResponse {
                    meeting_id,
                    call_id,
                    status: "streaming".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start session: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to start session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// Wire up capture, staging, bus and the duplex channel, then hand the
/// session to a background task
async fn launch_session(state: &AppState, meeting_id: &str) -> Result<Arc<SessionHandle>> {
    let cfg = Arc::clone(&state.config);
    let call_id = derive_call_id(meeting_id);

    let transport = NatsTransport::connect(&cfg.bus.url).await?;
    let bus = Arc::new(BusClient::new(
        Box::new(transport),
        &cfg.bus.subject_prefix,
        call_id.clone(),
    ));

    let session_config = SessionConfig {
        call_id: call_id.clone(),
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        language_code: cfg.transcribe.language_code.clone(),
        media_encoding: cfg.transcribe.media_encoding.clone(),
        channel_identification: cfg.transcribe.channel_identification,
        max_duration: Duration::from_secs(cfg.session.max_duration_secs),
        teardown_timeout: Duration::from_secs(cfg.session.teardown_timeout_secs),
    };

    let mut capture = CpalCapture::new(CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        ..CaptureConfig::default()
    });
    let audio_rx = capture.start().await.context("Failed to start audio capture")?;

    let staging_path =
        std::path::Path::new(&cfg.audio.staging_path).join(format!("{}.raw", call_id));
    let recorder = FrameRecorder::create(staging_path)?;

    let mut handshake_headers = Vec::new();
    if !cfg.transcribe.origin.is_empty() {
        handshake_headers.push(("origin".to_string(), cfg.transcribe.origin.clone()));
    }
    let resolver =
        StaticEndpointResolver::new(cfg.transcribe.endpoint.clone(), handshake_headers);

    let session = StreamingSession::new(session_config, bus);
    let (sink, source) = session.connect(&resolver).await?;

    let (signal_tx, signal_rx) = mpsc::channel(64);
    let handle = Arc::new(SessionHandle {
        call_id,
        started_at: Utc::now(),
        signal_tx,
        state: session.state_cell(),
        notes: session.notes_handle(),
    });

    let store = FsRecordingStore::new(
        cfg.recording.output_path.clone(),
        cfg.recording.url_prefix.clone(),
    );

    tokio::spawn(async move {
        match session
            .run(sink, source, audio_rx, recorder, signal_rx, &store)
            .await
        {
            Ok(summary) => info!(
                "Session {} complete: {} captions, {} frames sent",
                summary.call_id, summary.captions, summary.frames_sent
            ),
            Err(e) => error!("Session failed: {}", e),
        }

        if let Err(e) = capture.stop().await {
            error!("Failed to stop audio capture: {}", e);
        }
    });

    Ok(handle)
}

/// POST /meetings/:meeting_id/signals
/// Deliver a collaborator signal to a session
pub async fn push_signal(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    Json(signal): Json<MeetingSignal>,
) -> impl IntoResponse {
    let handle = {
        let sessions = state.sessions.read().await;
        sessions.get(&meeting_id).cloned()
    };

    match handle {
        Some(handle) => match handle.signal_tx.send(signal).await {
            Ok(()) => (
                StatusCode::OK,
                Json(SignalResponse {
                    status: "accepted".to_string(),
                }),
            )
                .into_response(),
            Err(_) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Meeting {} is no longer accepting signals", meeting_id),
                }),
            )
                .into_response(),
        },
        None => meeting_not_found(&meeting_id),
    }
}

/// GET /meetings/:meeting_id/status
/// Get status of a session
pub async fn get_meeting_status(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&meeting_id) {
        Some(handle) => {
            let captions = handle.notes.lock().await.caption_count();
            let duration = Utc::now().signed_duration_since(handle.started_at);
            (
                StatusCode::OK,
                Json(MeetingStatus {
                    meeting_id: meeting_id.clone(),
                    call_id: handle.call_id.clone(),
                    state: handle.state.get(),
                    started_at: handle.started_at,
                    duration_secs: duration.num_milliseconds() as f64 / 1000.0,
                    captions,
                }),
            )
                .into_response()
        }
        None => meeting_not_found(&meeting_id),
    }
}

/// GET /meetings/:meeting_id/transcript
/// Get the speaker-attributed caption log (accumulated so far)
pub async fn get_meeting_transcript(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&meeting_id) {
        Some(handle) => {
            let captions = handle.notes.lock().await.captions().to_vec();
            (StatusCode::OK, Json(captions)).into_response()
        }
        None => meeting_not_found(&meeting_id),
    }
}

/// GET /meetings/:meeting_id/export
/// Get the report collaborator's payload: attendees, chat and transcript
pub async fn get_meeting_export(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&meeting_id) {
        Some(handle) => {
            let export = handle.notes.lock().await.export();
            (StatusCode::OK, Json(export)).into_response()
        }
        None => meeting_not_found(&meeting_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
