use serde::Deserialize;

/// Typed signals the meeting-automation collaborator delivers into the
/// session's processing loop
///
/// Funneling these through one channel serializes them against the caption
/// log, so the collaborator and the inbound pump never race on shared
/// state.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeetingSignal {
    /// The active speaker shown by the meeting UI changed
    SpeakerChange { name: String },
    /// An attendee posted a chat message
    ChatMessage { text: String },
    /// The meeting ended or the scribe was asked to leave
    End,
}
