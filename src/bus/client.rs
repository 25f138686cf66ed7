use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::records::{
    now_timestamp, segment_id, EventType, LifecycleRecord, RecordingUrlRecord,
    TranscriptSegmentRecord, CHANNEL,
};
use crate::transcribe::TranscriptResult;

/// Transport the bus client publishes through
///
/// NATS in production; tests capture the byte stream in memory.
#[async_trait]
pub trait BusTransport: Send + Sync {
    async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<()>;
}

/// NATS-backed transport
pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    /// Connect to the NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }
}

#[async_trait]
impl BusTransport for NatsTransport {
    async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish record")?;
        Ok(())
    }
}

/// Transport that retains published records in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    records: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in publish order
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusTransport for MemoryTransport {
    async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<()> {
        self.records.lock().unwrap().push((subject, payload));
        Ok(())
    }
}

/// Publishes ordered lifecycle and transcript records for one call
///
/// Delivery is at-least-once: a replaced partial is published again with
/// updated text under the same segment id, and consumers reconcile on
/// segment id + partial flag.
pub struct BusClient {
    transport: Box<dyn BusTransport>,
    call_id: String,
    subject: String,
}

impl BusClient {
    pub fn new(transport: Box<dyn BusTransport>, subject_prefix: &str, call_id: String) -> Self {
        let subject = format!("{}.{}", subject_prefix, call_id);
        Self {
            transport,
            call_id,
            subject,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    async fn publish_record<T: Serialize + Sync>(&self, record: &T) -> Result<()> {
        let payload = serde_json::to_vec(record).context("Failed to serialize record")?;
        self.transport.publish(self.subject.clone(), payload).await
    }

    /// Publish the lifecycle START record
    pub async fn publish_start(&self) -> Result<()> {
        info!("Publishing START record for {}", self.call_id);
        self.publish_record(&LifecycleRecord {
            event_type: EventType::Start,
            call_id: self.call_id.clone(),
            created_at: now_timestamp(),
        })
        .await
    }

    /// Publish the lifecycle END record
    pub async fn publish_end(&self) -> Result<()> {
        info!("Publishing END record for {}", self.call_id);
        self.publish_record(&LifecycleRecord {
            event_type: EventType::End,
            call_id: self.call_id.clone(),
            created_at: now_timestamp(),
        })
        .await
    }

    /// Publish one transcript segment record, partial or final
    pub async fn publish_transcript_segment(
        &self,
        result: &TranscriptResult,
        speaker: &str,
    ) -> Result<()> {
        let start_time = result.start_time.unwrap_or(0.0);
        let end_time = result.end_time.unwrap_or(0.0);
        let now = now_timestamp();
        self.publish_record(&TranscriptSegmentRecord {
            event_type: EventType::AddTranscriptSegment,
            call_id: self.call_id.clone(),
            channel: CHANNEL.to_string(),
            segment_id: segment_id(start_time),
            start_time,
            end_time,
            transcript: result.transcript.clone(),
            is_partial: result.is_partial,
            created_at: now.clone(),
            updated_at: now,
            speaker: speaker.to_string(),
        })
        .await
    }

    /// Publish the recording location record
    pub async fn publish_recording_url(&self, recording_url: &str) -> Result<()> {
        info!(
            "Publishing recording url record for {}: {}",
            self.call_id, recording_url
        );
        self.publish_record(&RecordingUrlRecord {
            event_type: EventType::AddRecordingUrl,
            call_id: self.call_id.clone(),
            created_at: now_timestamp(),
            recording_url: recording_url.to_string(),
        })
        .await
    }
}
