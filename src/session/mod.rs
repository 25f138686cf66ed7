//! Streaming session management
//!
//! This module provides the `StreamingSession` abstraction that manages:
//! - The session state machine (idle → connecting → streaming → draining → closed)
//! - The outbound pump (capture frames → staging recorder → wire → service)
//! - The inbound pump (wire → transcript results → caption reconciliation)
//! - External meeting signals (speaker changes, chat, end)
//! - Drain, recording finalization and lifecycle record ordering

mod config;
mod notes;
mod session;
mod signals;
mod state;

pub use config::{derive_call_id, SessionConfig};
pub use notes::{CaptionEntry, MeetingExport, MeetingNotes, Reconciliation, TranscriptLine};
pub use session::{SessionSummary, StreamingSession};
pub use signals::MeetingSignal;
pub use state::{SessionState, StateCell};
