use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::meeting::MeetingMeta;

/// Status a bot starts in after a successful create request.
pub const STATUS_PENDING: &str = "pending";
/// Terminal status: the recording is finished and retrievable.
pub const STATUS_DONE: &str = "done";

/// Tracks one external recording agent instance. Status fields are stored
/// verbatim as reported by the provider and overwritten on every webhook
/// event (last-write-wins, no ordering check).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRecord {
    pub bot_id: String,
    pub meeting_url: String,
    /// Provider event id when the bot was scheduled from a calendar sync;
    /// the dedup key preventing double-scheduling.
    pub calendar_event_id: Option<String>,
    pub meta: MeetingMeta,
    pub status: String,
    pub status_time: Option<String>,
    pub sub_code: Option<String>,
    pub message: Option<String>,
    pub recording_id: Option<String>,
    /// Set once the recording URL is known and the processing job has been
    /// dispatched.
    pub video_url: Option<String>,
}

/// Keyed in-memory store of bot records.
#[derive(Default)]
pub struct BotStore {
    records: Arc<RwLock<HashMap<String, BotRecord>>>,
}

impl BotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: BotRecord) {
        let mut records = self.records.write().await;
        records.insert(record.bot_id.clone(), record);
    }

    pub async fn get(&self, bot_id: &str) -> Option<BotRecord> {
        let records = self.records.read().await;
        records.get(bot_id).cloned()
    }

    /// Overwrite the status fields unconditionally. Returns false when the
    /// bot is unknown.
    pub async fn update_status(
        &self,
        bot_id: &str,
        status: String,
        status_time: Option<String>,
        sub_code: Option<String>,
        message: Option<String>,
        recording_id: Option<String>,
    ) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(bot_id) {
            Some(record) => {
                record.status = status;
                record.status_time = status_time;
                record.sub_code = sub_code;
                record.message = message;
                record.recording_id = recording_id;
                true
            }
            None => false,
        }
    }

    pub async fn set_video_url(&self, bot_id: &str, url: String) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(bot_id) {
            Some(record) => {
                record.video_url = Some(url);
                true
            }
            None => false,
        }
    }

    /// Whether any bot was already scheduled for this calendar event.
    pub async fn find_by_event_id(&self, event_id: &str) -> Option<BotRecord> {
        let records = self.records.read().await;
        records
            .values()
            .find(|r| r.calendar_event_id.as_deref() == Some(event_id))
            .cloned()
    }
}
