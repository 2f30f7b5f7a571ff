use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Chunk ingestion boundary
        .route("/ingest/chunk", post(handlers::submit_chunk))
        .route("/ingest/finalize", post(handlers::finalize_session))
        // Recording bots
        .route("/bots", post(handlers::start_bot))
        // Signed provider webhooks
        .route("/webhooks/recording", post(handlers::recording_webhook))
        // Meeting records
        .route("/meetings", get(handlers::list_meetings))
        .route("/meetings/:meeting_id", get(handlers::get_meeting))
        .route("/meetings/:meeting_id/notes", post(handlers::update_notes))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // Chunks arrive from the browser capture client
        .layer(CorsLayer::permissive())
        .with_state(state)
}
