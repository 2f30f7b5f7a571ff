//! Durable meeting records
//!
//! One `MeetingRecord` is created at the end of a successful pipeline run
//! (inside the summarize stage) and never mutated afterwards, except for the
//! user-editable notes field.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::summarize::MeetingSummary;

/// A meeting participant with their role in the meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_id: Option<String>,
    /// e.g. "Manager", "Report", "Host", "Counterpart"
    pub role: String,
}

/// Metadata supplied by the finalize trigger (or the bot handoff); the
/// pipeline does not infer any of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingMeta {
    pub org_id: String,
    pub user_id: String,
    pub meeting_type: String,
    pub meeting_name: String,
    /// Human-readable duration as reported by the capture side,
    /// e.g. "0h 43m 17s".
    pub duration: String,
    pub date: String,
    pub attendees: Vec<Attendee>,
}

/// The durable record of one finished meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: String,
    pub org_id: String,
    pub meeting_type: String,
    pub meeting_name: String,
    pub duration: String,
    pub attendees: Vec<Attendee>,
    pub date: String,
    pub created_at: DateTime<Utc>,
    pub raw_transcript: String,
    pub summary: MeetingSummary,
    /// The only field editable after creation.
    pub notes: Option<String>,
}

impl MeetingRecord {
    pub fn new(meta: &MeetingMeta, raw_transcript: String, summary: MeetingSummary) -> Self {
        Self {
            id: format!("meeting-{}", uuid::Uuid::new_v4()),
            org_id: meta.org_id.clone(),
            meeting_type: meta.meeting_type.clone(),
            meeting_name: meta.meeting_name.clone(),
            duration: meta.duration.clone(),
            attendees: meta.attendees.clone(),
            date: meta.date.clone(),
            created_at: Utc::now(),
            raw_transcript,
            summary,
            notes: None,
        }
    }
}

/// Persistence for finished meetings.
#[async_trait::async_trait]
pub trait MeetingStore: Send + Sync {
    async fn add(&self, record: MeetingRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<MeetingRecord>>;

    async fn list(&self, org_id: &str) -> Result<Vec<MeetingRecord>>;

    async fn update_notes(&self, id: &str, notes: String) -> Result<bool>;
}

/// In-memory meeting store.
#[derive(Default)]
pub struct InMemoryMeetingStore {
    records: Arc<RwLock<Vec<MeetingRecord>>>,
}

impl InMemoryMeetingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn add(&self, record: MeetingRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MeetingRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, org_id: &str) -> Result<Vec<MeetingRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| r.org_id == org_id).cloned().collect())
    }

    async fn update_notes(&self, id: &str, notes: String) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.notes = Some(notes);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
