//! HTTP API server
//!
//! The event-driven boundary of the service:
//! - POST /ingest/chunk - accept one audio chunk
//! - POST /ingest/finalize - trigger processing for a session
//! - POST /bots - request a recording bot directly
//! - POST /webhooks/recording - signed provider webhooks (bot status,
//!   calendar sync)
//! - GET /meetings, /meetings/:id - stored meeting records
//! - GET /health - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
