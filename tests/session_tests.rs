// End-to-end session tests over the in-process loopback channel
//
// A scripted peer stands in for the transcription service: it receives
// audio events and answers with transcript events, so these tests exercise
// the codec, both pumps, reconciliation, record ordering, drain and
// recording finalization together.

use anyhow::Result;
use chrono::Utc;
use meeting_scribe::audio::{AudioFrame, FrameRecorder};
use meeting_scribe::bus::MemoryTransport;
use meeting_scribe::protocol::{self, HeaderValue, WireMessage};
use meeting_scribe::recording::FsRecordingStore;
use meeting_scribe::session::{
    MeetingSignal, SessionConfig, SessionState, SessionSummary, StreamingSession,
};
use meeting_scribe::transcribe::loopback_pair;
use meeting_scribe::BusClient;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

const CALL_ID: &str = "meeting-e2e-001";

fn transcript_event(text: &str, start: f64, partial: bool) -> Vec<u8> {
    let payload = serde_json::json!({
        "Transcript": {
            "Results": [{
                "StartTime": start,
                "EndTime": start + 1.0,
                "IsPartial": partial,
                "Alternatives": [{ "Transcript": text }]
            }]
        }
    });
    let message = WireMessage::new(
        vec![
            (":message-type".to_string(), HeaderValue::from("event")),
            (
                ":event-type".to_string(),
                HeaderValue::from("TranscriptEvent"),
            ),
        ],
        serde_json::to_vec(&payload).unwrap(),
    );
    protocol::encode(&message).unwrap()
}

fn test_session(transport: MemoryTransport) -> StreamingSession {
    let bus = Arc::new(BusClient::new(
        Box::new(transport),
        "meeting.events",
        CALL_ID.to_string(),
    ));
    let config = SessionConfig {
        call_id: CALL_ID.to_string(),
        max_duration: Duration::from_secs(30),
        teardown_timeout: Duration::from_secs(5),
        ..SessionConfig::default()
    };
    StreamingSession::new(config, bus)
}

fn audio_frame(sequence: u64) -> AudioFrame {
    AudioFrame {
        sequence,
        pcm: vec![0u8; 3200],
        captured_at: Utc::now(),
    }
}

async fn wait_for<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn test_end_to_end_drain_and_record_ordering() -> Result<()> {
    let temp = TempDir::new()?;
    let transport = MemoryTransport::new();
    let session = test_session(transport.clone());
    let state = session.state_cell();
    let notes = session.notes_handle();

    let ((client_sink, client_source), (mut service_sink, mut service_source)) = loopback_pair();

    // Scripted service: the first audio event gets a partial, the third
    // gets the finalized extension of the same utterance
    let service = tokio::spawn(async move {
        let mut received = 0usize;
        while let Ok(Some(_audio)) = service_source.recv().await {
            received += 1;
            if received == 1 {
                service_sink
                    .send(transcript_event("the quick", 0.5, true))
                    .await
                    .unwrap();
            } else if received == 3 {
                service_sink
                    .send(transcript_event("the quick brown fox", 0.5, false))
                    .await
                    .unwrap();
            }
        }
        let _ = service_sink.close().await;
        received
    });

    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (signal_tx, signal_rx) = mpsc::channel(16);
    let recorder = FrameRecorder::create(temp.path().join(format!("staging/{}.raw", CALL_ID)))?;
    let store = FsRecordingStore::new(temp.path().join("recordings"), "");

    let run = tokio::spawn(async move {
        session
            .run(client_sink, client_source, frame_rx, recorder, signal_rx, &store)
            .await
    });

    // attribute everything to Alice before any audio flows
    signal_tx
        .send(MeetingSignal::SpeakerChange {
            name: "Alice".to_string(),
        })
        .await?;
    {
        let notes = Arc::clone(&notes);
        wait_for(move || {
            notes
                .try_lock()
                .map(|n| n.current_speaker() == "Alice")
                .unwrap_or(false)
        })
        .await;
    }

    for sequence in 0..3 {
        frame_tx.send(audio_frame(sequence)).await?;
    }

    // both results land as one reconciled caption
    {
        let notes = Arc::clone(&notes);
        wait_for(move || {
            notes
                .try_lock()
                .map(|n| n.captions().last().map(|c| c.text.clone()) == Some("the quick brown fox".to_string()))
                .unwrap_or(false)
        })
        .await;
    }

    signal_tx.send(MeetingSignal::End).await?;

    let summary: SessionSummary =
        tokio::time::timeout(Duration::from_secs(10), run).await???;
    assert_eq!(state.get(), SessionState::Closed);
    assert_eq!(summary.frames_sent, 3);
    assert_eq!(summary.captions, 1);

    // the recording was finalized and published
    let url = summary.recording_url.expect("recording url");
    assert!(!url.is_empty());
    let published_wav = temp.path().join(format!("recordings/{}.wav", CALL_ID));
    assert!(published_wav.exists());
    let wav_len = std::fs::metadata(&published_wav)?.len();
    assert_eq!(wav_len, 44 + 3 * 3200);

    // reconciled caption log with retained attribution
    {
        let notes = notes.lock().await;
        assert_eq!(notes.caption_count(), 1);
        assert_eq!(notes.captions()[0].text, "the quick brown fox");
        assert_eq!(notes.captions()[0].speaker, "Alice");
        assert!(notes.captions()[0].finalized_at_receipt);
    }

    // record ordering: START first, segments in between, END, recording url last
    let types: Vec<String> = transport
        .published()
        .iter()
        .map(|(_, payload)| {
            let record: serde_json::Value = serde_json::from_slice(payload).unwrap();
            record["EventType"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(types.first().map(String::as_str), Some("START"));
    let end_pos = types.iter().position(|t| t == "END").expect("END record");
    let url_pos = types
        .iter()
        .position(|t| t == "ADD_RECORDING_URL")
        .expect("ADD_RECORDING_URL record");
    assert!(url_pos > end_pos);
    let segment_positions: Vec<usize> = types
        .iter()
        .enumerate()
        .filter(|(_, t)| *t == "ADD_TRANSCRIPT_SEGMENT")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(segment_positions.len(), 2); // the partial and its replacement
    assert!(segment_positions.iter().all(|&p| p > 0 && p < end_pos));

    let received = service.await?;
    assert_eq!(received, 3);

    Ok(())
}

#[tokio::test]
async fn test_corrupt_inbound_message_is_not_fatal() -> Result<()> {
    let temp = TempDir::new()?;
    let transport = MemoryTransport::new();
    let session = test_session(transport.clone());
    let state = session.state_cell();
    let notes = session.notes_handle();

    let ((client_sink, client_source), (mut service_sink, mut service_source)) = loopback_pair();

    let service = tokio::spawn(async move {
        // garbage first: the pump must drop it and keep going
        service_sink.send(b"garbage".to_vec()).await.unwrap();
        while let Ok(Some(_audio)) = service_source.recv().await {
            service_sink
                .send(transcript_event("still alive", 1.0, false))
                .await
                .unwrap();
            break;
        }
        let _ = service_sink.close().await;
    });

    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (signal_tx, signal_rx) = mpsc::channel(16);
    let recorder = FrameRecorder::create(temp.path().join(format!("staging/{}.raw", CALL_ID)))?;
    let store = FsRecordingStore::new(temp.path().join("recordings"), "");

    let run = tokio::spawn(async move {
        session
            .run(client_sink, client_source, frame_rx, recorder, signal_rx, &store)
            .await
    });

    signal_tx
        .send(MeetingSignal::SpeakerChange {
            name: "Alice".to_string(),
        })
        .await?;
    frame_tx.send(audio_frame(0)).await?;

    {
        let notes = Arc::clone(&notes);
        wait_for(move || {
            notes
                .try_lock()
                .map(|n| n.caption_count() == 1)
                .unwrap_or(false)
        })
        .await;
    }

    // the peer hangup may already have drained the session; the end signal
    // is then a no-op
    let _ = signal_tx.send(MeetingSignal::End).await;
    let summary = tokio::time::timeout(Duration::from_secs(10), run).await???;

    assert_eq!(state.get(), SessionState::Closed);
    assert_eq!(summary.captions, 1);
    service.await?;

    Ok(())
}

#[tokio::test]
async fn test_peer_close_triggers_normal_drain() -> Result<()> {
    let temp = TempDir::new()?;
    let transport = MemoryTransport::new();
    let session = test_session(transport.clone());
    let state = session.state_cell();

    let ((client_sink, client_source), (mut service_sink, mut service_source)) = loopback_pair();

    // the service hangs up after the first audio event
    let service = tokio::spawn(async move {
        let _ = service_source.recv().await;
        let _ = service_sink.close().await;
    });

    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (_signal_tx, signal_rx) = mpsc::channel::<MeetingSignal>(16);
    let recorder = FrameRecorder::create(temp.path().join(format!("staging/{}.raw", CALL_ID)))?;
    let store = FsRecordingStore::new(temp.path().join("recordings"), "");

    let run = tokio::spawn(async move {
        session
            .run(client_sink, client_source, frame_rx, recorder, signal_rx, &store)
            .await
    });

    frame_tx.send(audio_frame(0)).await?;

    // no end signal is ever sent; the hangup alone must drain the session
    let summary = tokio::time::timeout(Duration::from_secs(10), run).await???;

    assert_eq!(state.get(), SessionState::Closed);
    assert!(summary.recording_url.is_some());

    // END is still published, and the recording record still follows it
    let types: Vec<String> = transport
        .published()
        .iter()
        .map(|(_, payload)| {
            let record: serde_json::Value = serde_json::from_slice(payload).unwrap();
            record["EventType"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types.first().map(String::as_str), Some("START"));
    let end_pos = types.iter().position(|t| t == "END").expect("END record");
    let url_pos = types
        .iter()
        .position(|t| t == "ADD_RECORDING_URL")
        .expect("ADD_RECORDING_URL record");
    assert!(url_pos > end_pos);

    service.await?;

    Ok(())
}

#[tokio::test]
async fn test_deadline_forces_drain() -> Result<()> {
    let temp = TempDir::new()?;
    let transport = MemoryTransport::new();
    let bus = Arc::new(BusClient::new(
        Box::new(transport.clone()),
        "meeting.events",
        CALL_ID.to_string(),
    ));
    let config = SessionConfig {
        call_id: CALL_ID.to_string(),
        max_duration: Duration::from_millis(500), // very short meeting
        teardown_timeout: Duration::from_secs(5),
        ..SessionConfig::default()
    };
    let session = StreamingSession::new(config, bus);
    let state = session.state_cell();

    let ((client_sink, client_source), (mut service_sink, mut service_source)) = loopback_pair();
    let service = tokio::spawn(async move {
        while let Ok(Some(_audio)) = service_source.recv().await {}
        let _ = service_sink.close().await;
    });

    let (_frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(16);
    let (_signal_tx, signal_rx) = mpsc::channel::<MeetingSignal>(16);
    let recorder = FrameRecorder::create(temp.path().join(format!("staging/{}.raw", CALL_ID)))?;
    let store = FsRecordingStore::new(temp.path().join("recordings"), "");

    let run = tokio::spawn(async move {
        session
            .run(client_sink, client_source, frame_rx, recorder, signal_rx, &store)
            .await
    });

    // no signals, no audio: only the deadline can end this session
    let summary = tokio::time::timeout(Duration::from_secs(10), run).await???;

    assert_eq!(state.get(), SessionState::Closed);
    assert_eq!(summary.frames_sent, 0);
    service.await?;

    Ok(())
}
