//! HTTP API server for external control (meeting-automation collaborator)
//!
//! This module provides a REST API for driving scribe sessions:
//! - POST /meetings/start - Start a new session
//! - POST /meetings/:id/signals - Deliver a meeting signal (speaker change, chat, end)
//! - GET /meetings/:id/status - Query session status
//! - GET /meetings/:id/transcript - Get the speaker-attributed caption log
//! - GET /meetings/:id/export - Get the report collaborator's payload
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
