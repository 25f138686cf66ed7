use std::time::Duration;

use crate::transcribe::StreamSettings;

/// Configuration for one streaming session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Downstream call identifier, unique per session
    pub call_id: String,

    /// Sample rate of captured and recorded audio
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Language requested from the transcription service
    pub language_code: String,

    /// Encoding identifier for the outbound audio ("pcm")
    pub media_encoding: String,

    /// Ask the service to separate speakers by channel
    pub channel_identification: bool,

    /// Hard ceiling on meeting length; on expiry the session drains as if
    /// an end signal had arrived
    pub max_duration: Duration,

    /// Drop-dead deadline for finalize/publish steps during teardown
    pub teardown_timeout: Duration,
}

impl SessionConfig {
    /// Stream parameters handed to the endpoint resolver
    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            sample_rate: self.sample_rate,
            language_code: self.language_code.clone(),
            media_encoding: self.media_encoding.clone(),
            channel_count: self.channels,
            channel_identification: self.channel_identification,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_id: derive_call_id(&format!("meeting-{}", uuid::Uuid::new_v4())),
            sample_rate: 16000,
            channels: 1,
            language_code: "en-US".to_string(),
            media_encoding: "pcm".to_string(),
            channel_identification: false,
            max_duration: Duration::from_secs(12 * 60 * 60),
            teardown_timeout: Duration::from_secs(10),
        }
    }
}

/// Downstream call id: the meeting id suffixed with a millisecond timestamp
pub fn derive_call_id(meeting_id: &str) -> String {
    format!(
        "{}-{}",
        meeting_id,
        chrono::Utc::now().format("%Y-%m-%d-%H:%M:%S%.3f")
    )
}
