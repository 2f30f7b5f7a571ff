use std::sync::Arc;

use crate::bot::BotManager;
use crate::calendar::CalendarScheduler;
use crate::ingest::ChunkBuffer;
use crate::meeting::MeetingStore;
use crate::queue::JobQueue;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub buffer: Arc<ChunkBuffer>,
    pub queue: JobQueue,
    pub bots: Arc<BotManager>,
    pub scheduler: Arc<CalendarScheduler>,
    pub meetings: Arc<dyn MeetingStore>,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
}
