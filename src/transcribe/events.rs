use serde::Deserialize;

use crate::protocol::codec::{
    HEADER_EVENT_TYPE, HEADER_MESSAGE_TYPE, MESSAGE_TYPE_EVENT, MESSAGE_TYPE_EXCEPTION,
};
use crate::protocol::{ProtocolError, WireMessage};

/// One streaming transcription hypothesis
///
/// Partial results may still be revised by later results for the same
/// utterance; `is_partial == false` marks text the service will not revise.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptResult {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub transcript: String,
    pub is_partial: bool,
    /// Second-ranked hypothesis, when the service offers one
    pub alternative_text: String,
}

/// A classified inbound message
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Transcript results, in service order
    Transcript(Vec<TranscriptResult>),
    /// A valid event this pipeline has no handler for
    Other { event_type: String },
    /// Service-reported error inside a valid message; non-fatal
    Exception { message: String },
}

pub const EVENT_TYPE_TRANSCRIPT: &str = "TranscriptEvent";

// Serde model of the service's transcript payload.

#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    #[serde(rename = "Transcript")]
    transcript: TranscriptBody,
}

#[derive(Debug, Deserialize)]
struct TranscriptBody {
    #[serde(rename = "Results")]
    results: Vec<ResultBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(rename = "StartTime")]
    start_time: Option<f64>,
    #[serde(rename = "EndTime")]
    end_time: Option<f64>,
    #[serde(rename = "IsPartial")]
    is_partial: bool,
    #[serde(rename = "Alternatives", default)]
    alternatives: Vec<AlternativeBody>,
}

#[derive(Debug, Deserialize)]
struct AlternativeBody {
    #[serde(rename = "Transcript")]
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct ExceptionPayload {
    #[serde(rename = "Message")]
    message: String,
}

fn corrupt(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::CorruptMessage {
        reason: reason.into(),
    }
}

/// Classify a decoded inbound message
///
/// The `:message-type` header splits events from exceptions; within events,
/// `:event-type` picks out transcript results. Payloads that do not match
/// their declared type are reported as corrupt, which the inbound pump
/// treats as droppable.
pub fn classify(message: &WireMessage) -> Result<InboundEvent, ProtocolError> {
    match message.header_str(HEADER_MESSAGE_TYPE) {
        Some(MESSAGE_TYPE_EVENT) => {
            let event_type = message
                .header_str(HEADER_EVENT_TYPE)
                .ok_or_else(|| corrupt("event message without :event-type header"))?;
            if event_type != EVENT_TYPE_TRANSCRIPT {
                return Ok(InboundEvent::Other {
                    event_type: event_type.to_string(),
                });
            }
            let payload: TranscriptPayload = serde_json::from_slice(&message.payload)
                .map_err(|e| corrupt(format!("malformed transcript payload: {}", e)))?;
            let results = payload
                .transcript
                .results
                .into_iter()
                .map(|r| TranscriptResult {
                    start_time: r.start_time,
                    end_time: r.end_time,
                    transcript: r
                        .alternatives
                        .first()
                        .map(|a| a.transcript.clone())
                        .unwrap_or_default(),
                    is_partial: r.is_partial,
                    alternative_text: r
                        .alternatives
                        .get(1)
                        .map(|a| a.transcript.clone())
                        .unwrap_or_default(),
                })
                .collect();
            Ok(InboundEvent::Transcript(results))
        }
        Some(MESSAGE_TYPE_EXCEPTION) => {
            let payload: ExceptionPayload = serde_json::from_slice(&message.payload)
                .map_err(|e| corrupt(format!("malformed exception payload: {}", e)))?;
            Ok(InboundEvent::Exception {
                message: payload.message,
            })
        }
        Some(other) => Err(corrupt(format!("unknown message type {:?}", other))),
        None => Err(corrupt("message without :message-type header")),
    }
}
