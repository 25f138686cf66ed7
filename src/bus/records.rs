use serde::{Deserialize, Serialize};

/// Record types consumed by downstream systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Start,
    End,
    AddTranscriptSegment,
    AddRecordingUrl,
}

/// Channel label attributed to meeting audio
pub const CHANNEL: &str = "CALLER";

/// ISO-8601 timestamp with millisecond precision
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Segment identifier derived from the channel and the result's start time
///
/// Consumers reconcile partial updates under this identifier, so a revised
/// partial for the same utterance must produce the same id.
pub fn segment_id(start_time: f64) -> String {
    format!("{}-{}", CHANNEL, start_time)
}

/// Session lifecycle marker (START / END)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    #[serde(rename = "EventType")]
    pub event_type: EventType,
    #[serde(rename = "CallId")]
    pub call_id: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
}

/// One transcript result, partial or final
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegmentRecord {
    #[serde(rename = "EventType")]
    pub event_type: EventType,
    #[serde(rename = "CallId")]
    pub call_id: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "SegmentId")]
    pub segment_id: String,
    #[serde(rename = "StartTime")]
    pub start_time: f64,
    #[serde(rename = "EndTime")]
    pub end_time: f64,
    #[serde(rename = "Transcript")]
    pub transcript: String,
    #[serde(rename = "IsPartial")]
    pub is_partial: bool,
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: String,
    #[serde(rename = "Speaker")]
    pub speaker: String,
}

/// Location of the finalized recording; published after END
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingUrlRecord {
    #[serde(rename = "EventType")]
    pub event_type: EventType,
    #[serde(rename = "CallId")]
    pub call_id: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
    #[serde(rename = "RecordingUrl")]
    pub recording_url: String,
}
