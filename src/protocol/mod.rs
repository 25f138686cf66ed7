//! Binary wire protocol for the streaming transcription channel
//!
//! Messages are self-describing: a length prelude guarded by its own
//! checksum, a block of typed headers, an opaque payload, and a trailing
//! checksum over the whole message. Both directions of the duplex channel
//! use the same framing.

pub mod codec;
pub mod value;

pub use codec::{audio_event, decode, encode, ProtocolError, WireMessage};
pub use value::HeaderValue;
