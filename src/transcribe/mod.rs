//! Connection to the real-time speech-to-text service
//!
//! This module provides:
//! - The endpoint resolver contract (a collaborator signs connection URLs)
//! - The duplex channel the session streams over, behind seam traits so
//!   tests can run against an in-process loopback
//! - The typed model of inbound service events

pub mod channel;
pub mod events;
pub mod resolver;

pub use channel::{loopback_pair, ChannelError, MessageSink, MessageSource, WsChannel};
pub use events::{classify, InboundEvent, TranscriptResult};
pub use resolver::{Endpoint, EndpointResolver, StaticEndpointResolver, StreamSettings};
