use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/meetings/start", post(handlers::start_meeting))
        .route(
            "/meetings/:meeting_id/signals",
            post(handlers::push_signal),
        )
        // Meeting queries
        .route(
            "/meetings/:meeting_id/status",
            get(handlers::get_meeting_status),
        )
        .route(
            "/meetings/:meeting_id/transcript",
            get(handlers::get_meeting_transcript),
        )
        .route(
            "/meetings/:meeting_id/export",
            get(handlers::get_meeting_export),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
