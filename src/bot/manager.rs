use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use super::provider::{BotProvider, CreateBotRequest};
use super::record::{BotRecord, BotStore, STATUS_DONE, STATUS_PENDING};
use crate::meeting::MeetingMeta;
use crate::queue::{Enqueue, Job, JobQueue};

/// Parameters for scheduling a recording agent, from either the direct
/// start-bot path or the calendar sync path.
#[derive(Debug, Clone)]
pub struct RequestBot {
    pub meeting_url: String,
    pub calendar_event_id: Option<String>,
    /// RFC3339 join time; `None` means join now.
    pub join_at: Option<String>,
    pub meta: MeetingMeta,
}

/// A `bot.status_change` webhook payload after signature verification.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub bot_id: String,
    pub code: String,
    pub created_at: Option<String>,
    pub sub_code: Option<String>,
    pub message: Option<String>,
    pub recording_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Updated,
    /// No record for this bot id: the event is dropped and no retry is
    /// scheduled here; recovery depends on the provider resending.
    NotFound,
}

/// Drives the bot state machine and hands finished recordings to the
/// pipeline.
pub struct BotManager {
    provider: Arc<dyn BotProvider>,
    store: Arc<BotStore>,
    queue: JobQueue,
    bot_name: String,
    poll_interval: Duration,
    poll_attempts: u32,
    /// Bots with an active retrieval poll, to avoid stacking pollers.
    polling: Mutex<HashSet<String>>,
}

impl BotManager {
    pub fn new(
        provider: Arc<dyn BotProvider>,
        store: Arc<BotStore>,
        queue: JobQueue,
        bot_name: String,
        poll_interval: Duration,
        poll_attempts: u32,
    ) -> Self {
        Self {
            provider,
            store,
            queue,
            bot_name,
            poll_interval,
            poll_attempts,
            polling: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<BotStore> {
        &self.store
    }

    /// Request a recording agent from the provider and track it.
    pub async fn request_bot(&self, request: RequestBot) -> Result<BotRecord> {
        let created = self
            .provider
            .create_bot(CreateBotRequest {
                meeting_url: request.meeting_url.clone(),
                bot_name: self.bot_name.clone(),
                recording_mode: "audio_only".to_string(),
                join_at: request.join_at.clone(),
            })
            .await?;

        let record = BotRecord {
            bot_id: created.id.clone(),
            meeting_url: request.meeting_url,
            calendar_event_id: request.calendar_event_id,
            meta: request.meta,
            status: STATUS_PENDING.to_string(),
            status_time: Some(chrono::Utc::now().to_rfc3339()),
            sub_code: None,
            message: None,
            recording_id: None,
            video_url: None,
        };

        self.store.insert(record.clone()).await;
        info!("Bot {} requested for {}", record.bot_id, record.meeting_url);

        Ok(record)
    }

    /// Apply a verified status-change event. Status fields are overwritten
    /// unconditionally; the terminal `done` status triggers retrieval.
    pub async fn handle_status_change(self: Arc<Self>, event: StatusChange) -> Result<StatusOutcome> {
        let updated = self
            .store
            .update_status(
                &event.bot_id,
                event.code.clone(),
                event.created_at,
                event.sub_code,
                event.message,
                event.recording_id,
            )
            .await;

        if !updated {
            warn!("Status event for unknown bot {}", event.bot_id);
            return Ok(StatusOutcome::NotFound);
        }

        info!("Bot {} status -> {}", event.bot_id, event.code);

        if event.code == STATUS_DONE {
            let handed_off = self.retrieve(&event.bot_id).await?;
            if !handed_off {
                // The provider reported done but has no video URL yet. The
                // next webhook would normally retry retrieval; poll as a
                // fallback in case it never arrives.
                warn!(
                    "Bot {} is done but has no video yet, starting retrieval poll",
                    event.bot_id
                );
                self.spawn_retrieval_poll(event.bot_id);
            }
        }

        Ok(StatusOutcome::Updated)
    }

    /// Fetch bot details and, when a video is available, dispatch the
    /// processing job. Returns whether the handoff happened.
    ///
    /// The download itself belongs to the pipeline job; the webhook cycle
    /// only records the URL and enqueues.
    pub async fn retrieve(&self, bot_id: &str) -> Result<bool> {
        let record = self
            .store
            .get(bot_id)
            .await
            .with_context(|| format!("No record for bot {}", bot_id))?;

        if record.video_url.is_some() {
            // Already handed off; repeated done events are absorbed here and
            // by the queue's idempotency key.
            return Ok(true);
        }

        let details = self.provider.get_bot(bot_id).await?;

        let Some(video_url) = details.video_url else {
            info!("Bot {} has no video URL yet", bot_id);
            return Ok(false);
        };

        self.store.set_video_url(bot_id, video_url.clone()).await;
        info!("Bot {} recording ready, dispatching pipeline job", bot_id);

        let enqueue = self.queue.enqueue(Job::ProcessVideo {
            bot_id: bot_id.to_string(),
            video_url,
            meta: record.meta,
        })?;
        if enqueue == Enqueue::Duplicate {
            info!("Processing job for bot {} already queued", bot_id);
        }

        Ok(true)
    }

    /// Timeout-driven fallback for a stalled retrieval: re-run `retrieve` at
    /// a fixed interval until the video is handed off or attempts run out.
    pub fn spawn_retrieval_poll(self: Arc<Self>, bot_id: String) {
        {
            let mut polling = self.polling.lock().expect("polling set poisoned");
            if !polling.insert(bot_id.clone()) {
                return;
            }
        }

        let manager = self;
        tokio::spawn(async move {
            for attempt in 1..=manager.poll_attempts {
                tokio::time::sleep(manager.poll_interval).await;

                match manager.retrieve(&bot_id).await {
                    Ok(true) => {
                        info!("Retrieval poll for bot {} succeeded on attempt {}", bot_id, attempt);
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Retrieval poll for bot {} failed: {:#}", bot_id, e);
                    }
                }

                if attempt == manager.poll_attempts {
                    warn!(
                        "Giving up retrieval poll for bot {} after {} attempts",
                        bot_id, attempt
                    );
                }
            }

            let mut polling = manager.polling.lock().expect("polling set poisoned");
            polling.remove(&bot_id);
        });
    }
}

/// Convenience constructor for the meta a bot meeting carries before any
/// duration is known.
pub fn bot_meeting_meta(
    org_id: &str,
    user_id: &str,
    meeting_type: &str,
    meeting_name: &str,
    date: &str,
    attendees: Vec<crate::meeting::Attendee>,
) -> MeetingMeta {
    MeetingMeta {
        org_id: org_id.to_string(),
        user_id: user_id.to_string(),
        meeting_type: meeting_type.to_string(),
        meeting_name: meeting_name.to_string(),
        duration: String::new(),
        date: date.to_string(),
        attendees,
    }
}
