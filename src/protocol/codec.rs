use thiserror::Error;

use super::value::HeaderValue;

/// Header names used by both directions of the channel
pub const HEADER_MESSAGE_TYPE: &str = ":message-type";
pub const HEADER_EVENT_TYPE: &str = ":event-type";
pub const HEADER_CONTENT_TYPE: &str = ":content-type";

/// Message type values
pub const MESSAGE_TYPE_EVENT: &str = "event";
pub const MESSAGE_TYPE_EXCEPTION: &str = "exception";

/// Event type carried by outbound audio messages
pub const EVENT_TYPE_AUDIO: &str = "AudioEvent";

// prelude = total length (4) + headers length (4) + prelude checksum (4)
const PRELUDE_LEN: usize = 12;
const CHECKSUM_LEN: usize = 4;
const MIN_MESSAGE_LEN: usize = PRELUDE_LEN + CHECKSUM_LEN;

/// Errors from encoding or decoding wire messages
///
/// `CorruptMessage` is non-fatal at the session level: the pump that hit it
/// drops the message and keeps going.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("corrupt message: {reason}")]
    CorruptMessage { reason: String },

    #[error("header {name:?} does not fit the wire format")]
    OversizedHeader { name: String },
}

fn corrupt(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::CorruptMessage {
        reason: reason.into(),
    }
}

/// A decoded wire message: ordered headers plus an opaque payload
///
/// Header names are unique within a message; `decode` rejects duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Vec<u8>,
}

impl WireMessage {
    pub fn new(headers: Vec<(String, HeaderValue)>, payload: Vec<u8>) -> Self {
        Self { headers, payload }
    }

    /// Look up a header by name
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// String value of a header, if present and a string
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(HeaderValue::as_str)
    }
}

/// Encode a message into its wire representation
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut header_block = Vec::new();
    for (name, value) in &message.headers {
        let name_bytes = name.as_bytes();
        if name_bytes.len() > u8::MAX as usize {
            return Err(ProtocolError::OversizedHeader { name: name.clone() });
        }
        let value_bytes = value.value_bytes();
        if value_bytes.len() > u16::MAX as usize {
            return Err(ProtocolError::OversizedHeader { name: name.clone() });
        }
        header_block.push(name_bytes.len() as u8);
        header_block.extend_from_slice(name_bytes);
        header_block.push(value.type_tag());
        header_block.extend_from_slice(&(value_bytes.len() as u16).to_be_bytes());
        header_block.extend_from_slice(&value_bytes);
    }

    let total_len = PRELUDE_LEN + header_block.len() + message.payload.len() + CHECKSUM_LEN;

    let mut buf = Vec::with_capacity(total_len);
    buf.extend_from_slice(&(total_len as u32).to_be_bytes());
    buf.extend_from_slice(&(header_block.len() as u32).to_be_bytes());
    let prelude_crc = crc32fast::hash(&buf[..8]);
    buf.extend_from_slice(&prelude_crc.to_be_bytes());
    buf.extend_from_slice(&header_block);
    buf.extend_from_slice(&message.payload);
    let message_crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&message_crc.to_be_bytes());

    Ok(buf)
}

/// Decode a wire message, validating both checksums
///
/// The prelude checksum is validated before the length fields are trusted;
/// the trailing checksum covers every preceding byte of the message.
pub fn decode(bytes: &[u8]) -> Result<WireMessage, ProtocolError> {
    if bytes.len() < MIN_MESSAGE_LEN {
        return Err(corrupt("message shorter than prelude and checksum"));
    }

    let total_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let headers_len = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let prelude_crc = u32::from_be_bytes(bytes[8..12].try_into().unwrap());

    if crc32fast::hash(&bytes[..8]) != prelude_crc {
        return Err(corrupt("prelude checksum mismatch"));
    }
    if total_len != bytes.len() {
        return Err(corrupt(format!(
            "length prefix {} disagrees with message size {}",
            total_len,
            bytes.len()
        )));
    }
    if PRELUDE_LEN + headers_len + CHECKSUM_LEN > total_len {
        return Err(corrupt("header block overruns message"));
    }

    let body_end = total_len - CHECKSUM_LEN;
    let message_crc = u32::from_be_bytes(bytes[body_end..].try_into().unwrap());
    if crc32fast::hash(&bytes[..body_end]) != message_crc {
        return Err(corrupt("message checksum mismatch"));
    }

    let headers = decode_headers(&bytes[PRELUDE_LEN..PRELUDE_LEN + headers_len])?;
    let payload = bytes[PRELUDE_LEN + headers_len..body_end].to_vec();

    Ok(WireMessage { headers, payload })
}

fn decode_headers(block: &[u8]) -> Result<Vec<(String, HeaderValue)>, ProtocolError> {
    let mut headers: Vec<(String, HeaderValue)> = Vec::new();
    let mut cursor = 0;

    while cursor < block.len() {
        let name_len = block[cursor] as usize;
        cursor += 1;
        let name_end = cursor + name_len;
        if name_end > block.len() {
            return Err(corrupt("truncated header name"));
        }
        let name = std::str::from_utf8(&block[cursor..name_end])
            .map_err(|_| corrupt("header name is not UTF-8"))?
            .to_string();
        cursor = name_end;

        if cursor + 3 > block.len() {
            return Err(corrupt("truncated header value prefix"));
        }
        let tag = block[cursor];
        let value_len =
            u16::from_be_bytes(block[cursor + 1..cursor + 3].try_into().unwrap()) as usize;
        cursor += 3;
        let value_end = cursor + value_len;
        if value_end > block.len() {
            return Err(corrupt("truncated header value"));
        }
        let value = HeaderValue::from_wire(tag, &block[cursor..value_end])
            .ok_or_else(|| corrupt(format!("header {:?} has malformed value (tag {})", name, tag)))?;
        cursor = value_end;

        if headers.iter().any(|(existing, _)| *existing == name) {
            return Err(corrupt(format!("duplicate header {:?}", name)));
        }
        headers.push((name, value));
    }

    Ok(headers)
}

/// Encode one outbound audio frame as an audio-event message
pub fn audio_event(pcm: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let message = WireMessage::new(
        vec![
            (HEADER_MESSAGE_TYPE.to_string(), MESSAGE_TYPE_EVENT.into()),
            (HEADER_EVENT_TYPE.to_string(), EVENT_TYPE_AUDIO.into()),
            (
                HEADER_CONTENT_TYPE.to_string(),
                "application/octet-stream".into(),
            ),
        ],
        pcm.to_vec(),
    );
    encode(&message)
}
