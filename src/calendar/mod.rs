//! Calendar sync scheduling
//!
//! Reacts to `calendar.sync_events` notifications: lists the calendar's
//! upcoming events (all pages), skips anything deleted or without a joinable
//! meeting URL, and requests one recording bot per event. The provider event
//! id is the dedup key: repeated sync notifications never double-schedule.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::bot::{bot_meeting_meta, BotManager, RequestBot};
use crate::meeting::Attendee;

/// One calendar event as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    /// RFC3339 start time.
    pub start_time: String,
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<CalendarEvent>,
    pub next_page: Option<String>,
}

/// Paginated event listing for one calendar.
#[async_trait::async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_events(
        &self,
        calendar_id: &str,
        updated_since: Option<&str>,
        page: Option<&str>,
    ) -> Result<EventPage>;
}

/// Recall-style HTTP client for the calendar events API.
pub struct RecallCalendarClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl RecallCalendarClient {
    pub fn new(config: &crate::config::BotConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    results: Vec<CalendarEvent>,
    next: Option<String>,
}

#[async_trait::async_trait]
impl CalendarProvider for RecallCalendarClient {
    async fn list_events(
        &self,
        calendar_id: &str,
        updated_since: Option<&str>,
        page: Option<&str>,
    ) -> Result<EventPage> {
        let url = format!("{}/calendar-events/", self.api_base);

        let mut query: Vec<(&str, &str)> = vec![("calendar_id", calendar_id)];
        if let Some(since) = updated_since {
            query.push(("updated_at__gte", since));
        }
        if let Some(cursor) = page {
            query.push(("cursor", cursor));
        }

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&query)
            .send()
            .await
            .context("Failed to send calendar events request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "Calendar events request for {} failed with status {}",
                calendar_id,
                status
            );
        }

        let listed: EventListResponse = response
            .json()
            .await
            .context("Failed to parse calendar events response")?;

        Ok(EventPage {
            events: listed.results,
            next_page: listed.next,
        })
    }
}

/// The user and organization a synced calendar belongs to.
#[derive(Debug, Clone)]
pub struct CalendarOwner {
    pub org_id: String,
    pub user_id: String,
    pub attendee: Attendee,
}

/// Maps provider calendar ids onto their owners.
#[derive(Default)]
pub struct CalendarAccounts {
    owners: Arc<RwLock<HashMap<String, CalendarOwner>>>,
}

impl CalendarAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, calendar_id: &str, owner: CalendarOwner) {
        let mut owners = self.owners.write().await;
        owners.insert(calendar_id.to_string(), owner);
    }

    pub async fn owner_of(&self, calendar_id: &str) -> Option<CalendarOwner> {
        let owners = self.owners.read().await;
        owners.get(calendar_id).cloned()
    }
}

/// Handles one sync notification end to end.
pub struct CalendarScheduler {
    provider: Arc<dyn CalendarProvider>,
    accounts: Arc<CalendarAccounts>,
    bots: Arc<BotManager>,
}

impl CalendarScheduler {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        accounts: Arc<CalendarAccounts>,
        bots: Arc<BotManager>,
    ) -> Self {
        Self {
            provider,
            accounts,
            bots,
        }
    }

    /// Process a `calendar.sync_events` notification. Returns the number of
    /// bots newly scheduled.
    pub async fn handle_sync(&self, calendar_id: &str, last_updated_ts: Option<&str>) -> Result<u32> {
        let Some(owner) = self.accounts.owner_of(calendar_id).await else {
            warn!("Sync event for unknown calendar {}", calendar_id);
            return Ok(0);
        };

        let mut scheduled = 0;
        let mut page: Option<String> = None;

        loop {
            let result = self
                .provider
                .list_events(calendar_id, last_updated_ts, page.as_deref())
                .await?;

            for event in result.events {
                if event.deleted {
                    continue;
                }
                let Some(meeting_url) = event.meeting_url.clone() else {
                    continue;
                };

                if self.bots.store().find_by_event_id(&event.id).await.is_some() {
                    info!("Bot already scheduled for calendar event {}", event.id);
                    continue;
                }

                let date = event
                    .start_time
                    .split('T')
                    .next()
                    .unwrap_or(&event.start_time)
                    .to_string();

                let request = RequestBot {
                    meeting_url,
                    calendar_event_id: Some(event.id.clone()),
                    join_at: Some(event.start_time.clone()),
                    meta: bot_meeting_meta(
                        &owner.org_id,
                        &owner.user_id,
                        "General",
                        &event.title,
                        &date,
                        vec![owner.attendee.clone()],
                    ),
                };

                match self.bots.request_bot(request).await {
                    Ok(record) => {
                        info!(
                            "Scheduled bot {} for calendar event {}",
                            record.bot_id, event.id
                        );
                        scheduled += 1;
                    }
                    Err(e) => {
                        warn!("Failed to schedule bot for event {}: {:#}", event.id, e);
                    }
                }
            }

            match result.next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }

        Ok(scheduled)
    }
}
