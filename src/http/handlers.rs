use super::state::AppState;
use crate::bot::{bot_meeting_meta, RequestBot, StatusChange, StatusOutcome};
use crate::ingest;
use crate::keys::SessionKey;
use crate::meeting::{Attendee, MeetingMeta};
use crate::queue::Enqueue;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChunkMessage {
    /// Session-scoped chunk key with a trailing numeric index,
    /// e.g. "host-1/report-2/2025-01-10/3.webm".
    pub key: String,
    /// Base64-encoded audio bytes.
    #[serde(rename = "audioData")]
    pub audio_data: String,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub host_id: String,
    pub counterpart: String,
    pub date: String,
    pub duration: String,
    pub org_id: String,
    pub meeting_type: String,
    pub meeting_name: String,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub status: String,
    pub job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartBotRequest {
    pub meeting_url: String,
    pub meeting_name: String,
    pub meeting_type: String,
    pub join_at: Option<String>,
    pub org_id: String,
    pub user_id: String,
    pub date: String,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Serialize)]
pub struct StartBotResponse {
    pub bot_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMeetingsQuery {
    pub org_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Webhook payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BotStatusData {
    bot_id: String,
    status: BotStatusInfo,
}

#[derive(Debug, Deserialize)]
struct BotStatusInfo {
    code: String,
    created_at: Option<String>,
    sub_code: Option<String>,
    message: Option<String>,
    recording_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarSyncData {
    calendar_id: String,
    last_updated_ts: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /ingest/chunk
///
/// Ingestion errors are swallowed at this boundary: the sender always gets
/// 200 and failures are only logged.
pub async fn submit_chunk(
    State(state): State<AppState>,
    Json(msg): Json<ChunkMessage>,
) -> impl IntoResponse {
    match base64::engine::general_purpose::STANDARD.decode(&msg.audio_data) {
        Ok(bytes) => {
            state.buffer.submit_chunk(&msg.key, &bytes).await;
        }
        Err(e) => {
            warn!("Dropping chunk {} with undecodable payload: {}", msg.key, e);
        }
    }

    StatusCode::OK
}

/// POST /ingest/finalize
/// Enqueue exactly one processing job for the session; never blocks on the
/// pipeline itself.
pub async fn finalize_session(
    State(state): State<AppState>,
    Json(req): Json<FinalizeRequest>,
) -> impl IntoResponse {
    let session = SessionKey::new(&req.host_id, &req.counterpart, &req.date);
    let meta = MeetingMeta {
        org_id: req.org_id,
        user_id: req.host_id.clone(),
        meeting_type: req.meeting_type,
        meeting_name: req.meeting_name,
        duration: req.duration,
        date: req.date,
        attendees: req.attendees,
    };

    match ingest::finalize(&state.queue, session, meta) {
        Ok(Enqueue::Accepted { job_id }) => (
            StatusCode::OK,
            Json(FinalizeResponse {
                status: "queued".to_string(),
                job_id: Some(job_id),
            }),
        )
            .into_response(),
        Ok(Enqueue::Duplicate) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A job for this session is already queued or running".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to enqueue job: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to enqueue job: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /bots
/// Request a recording bot for a meeting URL.
pub async fn start_bot(
    State(state): State<AppState>,
    Json(req): Json<StartBotRequest>,
) -> impl IntoResponse {
    let request = RequestBot {
        meeting_url: req.meeting_url,
        calendar_event_id: None,
        join_at: req.join_at,
        meta: bot_meeting_meta(
            &req.org_id,
            &req.user_id,
            &req.meeting_type,
            &req.meeting_name,
            &req.date,
            req.attendees,
        ),
    };

    match state.bots.request_bot(request).await {
        Ok(record) => (
            StatusCode::OK,
            Json(StartBotResponse {
                bot_id: record.bot_id,
                status: record.status,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start bot: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Failed to start bot: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /webhooks/recording
///
/// Signature verification happens on the raw body before any payload field
/// is trusted; an unverifiable webhook changes no state.
pub async fn recording_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let (Some(msg_id), Some(timestamp), Some(signature)) = (
        header("svix-id"),
        header("svix-timestamp"),
        header("svix-signature"),
    ) else {
        warn!("Webhook rejected: missing signature headers");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Missing signature headers".to_string(),
            }),
        )
            .into_response();
    };

    if let Err(e) =
        crate::bot::verify_signature(&state.webhook_secret, msg_id, timestamp, &body, signature)
    {
        warn!("Webhook rejected: {}", e);
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid webhook signature".to_string(),
            }),
        )
            .into_response();
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Webhook payload unparseable: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Unparseable webhook payload".to_string(),
                }),
            )
                .into_response();
        }
    };

    match envelope.event.as_str() {
        "bot.status_change" => {
            let data: BotStatusData = match serde_json::from_value(envelope.data) {
                Ok(data) => data,
                Err(e) => {
                    warn!("bot.status_change payload unparseable: {}", e);
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse {
                            error: "Unparseable status payload".to_string(),
                        }),
                    )
                        .into_response();
                }
            };

            let change = StatusChange {
                bot_id: data.bot_id,
                code: data.status.code,
                created_at: data.status.created_at,
                sub_code: data.status.sub_code,
                message: data.status.message,
                recording_id: data.status.recording_id,
            };

            match state.bots.clone().handle_status_change(change).await {
                Ok(StatusOutcome::Updated) => {
                    (StatusCode::OK, Json(serde_json::json!({"status": "success"})))
                        .into_response()
                }
                Ok(StatusOutcome::NotFound) => (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse {
                        error: "Bot record not found".to_string(),
                    }),
                )
                    .into_response(),
                Err(e) => {
                    error!("Failed to handle status change: {:#}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorResponse {
                            error: format!("Failed to handle status change: {}", e),
                        }),
                    )
                        .into_response()
                }
            }
        }
        "calendar.sync_events" => {
            let data: CalendarSyncData = match serde_json::from_value(envelope.data) {
                Ok(data) => data,
                Err(e) => {
                    warn!("calendar.sync_events payload unparseable: {}", e);
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse {
                            error: "Unparseable sync payload".to_string(),
                        }),
                    )
                        .into_response();
                }
            };

            match state
                .scheduler
                .handle_sync(&data.calendar_id, data.last_updated_ts.as_deref())
                .await
            {
                Ok(scheduled) => (
                    StatusCode::OK,
                    Json(serde_json::json!({"status": "success", "scheduled": scheduled})),
                )
                    .into_response(),
                Err(e) => {
                    error!("Failed to handle calendar sync: {:#}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorResponse {
                            error: format!("Failed to handle calendar sync: {}", e),
                        }),
                    )
                        .into_response()
                }
            }
        }
        other => {
            info!("Ignoring unhandled webhook event type: {}", other);
            (StatusCode::OK, Json(serde_json::json!({"status": "ignored"}))).into_response()
        }
    }
}

/// GET /meetings?org_id=...
pub async fn list_meetings(
    State(state): State<AppState>,
    Query(query): Query<ListMeetingsQuery>,
) -> impl IntoResponse {
    match state.meetings.list(&query.org_id).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!("Failed to list meetings: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to list meetings: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /meetings/:meeting_id
pub async fn get_meeting(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    match state.meetings.get(&meeting_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Meeting {} not found", meeting_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to fetch meeting: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to fetch meeting: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /meetings/:meeting_id/notes
/// Notes are the only user-editable field of a finished meeting.
pub async fn update_notes(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    Json(req): Json<UpdateNotesRequest>,
) -> impl IntoResponse {
    match state.meetings.update_notes(&meeting_id, req.notes).await {
        Ok(true) => (StatusCode::OK, Json(serde_json::json!({"status": "updated"}))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Meeting {} not found", meeting_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to update notes: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to update notes: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
