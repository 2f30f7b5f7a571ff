// HTTP surface tests using the real router with scripted providers behind it.
//
// Webhook requests are signed the same way the provider signs them, so these
// cover the verify-before-trust boundary end to end.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use morph_meetings::bot::{
    sign_payload, BotDetails, BotManager, BotProvider, BotStore, CreateBotRequest, CreatedBot,
};
use morph_meetings::calendar::{
    CalendarAccounts, CalendarEvent, CalendarOwner, CalendarProvider, CalendarScheduler, EventPage,
};
use morph_meetings::http::{create_router, AppState};
use morph_meetings::ingest::ChunkBuffer;
use morph_meetings::meeting::{
    Attendee, InMemoryMeetingStore, MeetingMeta, MeetingRecord, MeetingStore,
};
use morph_meetings::queue::{JobQueue, JobReceiver};
use morph_meetings::storage::{ArtifactStore, FsArtifactStore};
use morph_meetings::summarize::{MeetingSummary, SummaryValue};

const SECRET: &str = "whsec_dGVzdC1zZWNyZXQtdGVzdC1zZWNyZXQ=";
const OTHER_SECRET: &str = "whsec_b3RoZXItc2VjcmV0LW90aGVyLXNlY3JldA==";

struct MockBotProvider {
    created: AtomicUsize,
}

#[async_trait::async_trait]
impl BotProvider for MockBotProvider {
    async fn create_bot(&self, _request: CreateBotRequest) -> Result<CreatedBot> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedBot {
            id: format!("bot-{}", n + 1),
        })
    }

    async fn get_bot(&self, bot_id: &str) -> Result<BotDetails> {
        Ok(BotDetails {
            id: bot_id.to_string(),
            video_url: None,
        })
    }

    async fn download_video(&self, _video_url: &str) -> Result<Vec<u8>> {
        Ok(vec![])
    }
}

struct MockCalendarProvider;

#[async_trait::async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn list_events(
        &self,
        _calendar_id: &str,
        _updated_since: Option<&str>,
        _page: Option<&str>,
    ) -> Result<EventPage> {
        Ok(EventPage {
            events: vec![
                CalendarEvent {
                    id: "evt-1".to_string(),
                    title: "Planning".to_string(),
                    start_time: "2025-01-12T10:00:00Z".to_string(),
                    meeting_url: Some("https://meet.example.com/planning".to_string()),
                    deleted: false,
                },
                CalendarEvent {
                    id: "evt-2".to_string(),
                    title: "Cancelled".to_string(),
                    start_time: "2025-01-12T11:00:00Z".to_string(),
                    meeting_url: Some("https://meet.example.com/cancelled".to_string()),
                    deleted: true,
                },
                CalendarEvent {
                    id: "evt-3".to_string(),
                    title: "Focus block".to_string(),
                    start_time: "2025-01-12T12:00:00Z".to_string(),
                    meeting_url: None,
                    deleted: false,
                },
            ],
            next_page: None,
        })
    }
}

struct Fixture {
    app: Router,
    store: Arc<FsArtifactStore>,
    meetings: Arc<InMemoryMeetingStore>,
    _receiver: JobReceiver,
    _store_dir: TempDir,
}

async fn fixture() -> Result<Fixture> {
    let store_dir = TempDir::new()?;

    let store = Arc::new(FsArtifactStore::new(store_dir.path())?);
    let meetings = Arc::new(InMemoryMeetingStore::new());
    let (queue, receiver) = JobQueue::new(16);

    let bots = Arc::new(BotManager::new(
        Arc::new(MockBotProvider {
            created: AtomicUsize::new(0),
        }),
        Arc::new(BotStore::new()),
        queue.clone(),
        "Test Notetaker".to_string(),
        Duration::from_secs(60),
        1,
    ));

    let accounts = Arc::new(CalendarAccounts::new());
    accounts
        .register(
            "cal-1",
            CalendarOwner {
                org_id: "org-1".to_string(),
                user_id: "host-1".to_string(),
                attendee: Attendee {
                    first_name: "Ana".to_string(),
                    last_name: "Reyes".to_string(),
                    email: "ana@example.com".to_string(),
                    user_id: Some("host-1".to_string()),
                    role: "Host".to_string(),
                },
            },
        )
        .await;

    let scheduler = Arc::new(CalendarScheduler::new(
        Arc::new(MockCalendarProvider),
        accounts,
        Arc::clone(&bots),
    ));

    let state = AppState {
        buffer: Arc::new(ChunkBuffer::new(
            Arc::clone(&store) as Arc<dyn ArtifactStore>,
            480,
        )),
        queue,
        bots,
        scheduler,
        meetings: Arc::clone(&meetings) as Arc<dyn MeetingStore>,
        webhook_secret: SECRET.to_string(),
    };

    Ok(Fixture {
        app: create_router(state),
        store,
        meetings,
        _receiver: receiver,
        _store_dir: store_dir,
    })
}

fn webhook_request(secret: &str, payload: &str) -> Request<Body> {
    let signature = sign_payload(secret, "msg_1", "1736500000", payload.as_bytes()).unwrap();
    Request::builder()
        .method("POST")
        .uri("/webhooks/recording")
        .header("content-type", "application/json")
        .header("svix-id", "msg_1")
        .header("svix-timestamp", "1736500000")
        .header("svix-signature", signature)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let fx = fixture().await?;
    let response = fx
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_webhook_without_signature_headers_is_unauthorized() -> Result<()> {
    let fx = fixture().await?;

    let response = fx
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/recording")
                .body(Body::from(r#"{"event":"bot.status_change","data":{}}"#))
                .unwrap(),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_webhook_signed_with_wrong_secret_is_unauthorized() -> Result<()> {
    let fx = fixture().await?;
    let payload = r#"{"event":"calendar.sync_events","data":{"calendar_id":"cal-1","last_updated_ts":null}}"#;

    let response = fx.app.oneshot(webhook_request(OTHER_SECRET, payload)).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_signed_unparseable_payload_is_bad_request() -> Result<()> {
    let fx = fixture().await?;

    let response = fx.app.oneshot(webhook_request(SECRET, "not json")).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_calendar_sync_schedules_once_per_event() -> Result<()> {
    let fx = fixture().await?;
    let payload = r#"{"event":"calendar.sync_events","data":{"calendar_id":"cal-1","last_updated_ts":null}}"#;

    // Only evt-1 is live and joinable.
    let response = fx
        .app
        .clone()
        .oneshot(webhook_request(SECRET, payload))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["scheduled"], 1);

    // A repeated sync notification schedules nothing new.
    let response = fx.app.oneshot(webhook_request(SECRET, payload)).await?;
    assert_eq!(response_json(response).await["scheduled"], 0);

    Ok(())
}

#[tokio::test]
async fn test_status_change_for_unknown_bot_is_not_found() -> Result<()> {
    let fx = fixture().await?;
    let payload = r#"{"event":"bot.status_change","data":{"bot_id":"bot-ghost","status":{"code":"done","created_at":null,"sub_code":null,"message":null,"recording_id":null}}}"#;

    let response = fx.app.oneshot(webhook_request(SECRET, payload)).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_unknown_webhook_event_is_acknowledged() -> Result<()> {
    let fx = fixture().await?;
    let payload = r#"{"event":"participant.joined","data":{}}"#;

    let response = fx.app.oneshot(webhook_request(SECRET, payload)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "ignored");
    Ok(())
}

#[tokio::test]
async fn test_chunk_ingestion_always_returns_ok() -> Result<()> {
    let fx = fixture().await?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(b"audio-bytes");
    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/ingest/chunk",
            serde_json::json!({"key": "host-1/report-7/2025-01-10/0.webm", "audioData": encoded}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        fx.store.get("host-1/report-7/2025-01-10/0.webm").await?,
        b"audio-bytes"
    );

    // Undecodable payloads are dropped, not surfaced to the sender.
    let response = fx
        .app
        .oneshot(json_request(
            "POST",
            "/ingest/chunk",
            serde_json::json!({"key": "host-1/report-7/2025-01-10/1.webm", "audioData": "%%%"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(fx
        .store
        .get("host-1/report-7/2025-01-10/1.webm")
        .await
        .is_err());

    Ok(())
}

#[tokio::test]
async fn test_finalize_rejects_duplicate_session() -> Result<()> {
    let fx = fixture().await?;
    let body = serde_json::json!({
        "host_id": "host-1",
        "counterpart": "report-7",
        "date": "2025-01-10",
        "duration": "0h 30m 0s",
        "org_id": "org-1",
        "meeting_type": "One-on-One",
        "meeting_name": "Weekly sync",
        "attendees": [],
    });

    let response = fx
        .app
        .clone()
        .oneshot(json_request("POST", "/ingest/finalize", body.clone()))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let queued = response_json(response).await;
    assert_eq!(queued["status"], "queued");
    assert!(queued["job_id"].as_str().unwrap().starts_with("job-"));

    // No worker drains the queue here, so the session key is still reserved.
    let response = fx
        .app
        .oneshot(json_request("POST", "/ingest/finalize", body))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn test_meeting_lookup_and_notes() -> Result<()> {
    let fx = fixture().await?;

    let record = MeetingRecord::new(
        &MeetingMeta {
            org_id: "org-1".to_string(),
            user_id: "host-1".to_string(),
            meeting_type: "One-on-One".to_string(),
            meeting_name: "Weekly sync".to_string(),
            duration: "0h 30m 0s".to_string(),
            date: "2025-01-10".to_string(),
            attendees: vec![],
        },
        "transcript".to_string(),
        MeetingSummary::new(vec![(
            "Summary".to_string(),
            SummaryValue::Text("fine".to_string()),
        )]),
    );
    let id = record.id.clone();
    fx.meetings.add(record).await?;

    let response = fx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/meetings?org_id=org-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);

    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/meetings/{}/notes", id),
            serde_json::json!({"notes": "follow up next week"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = fx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/meetings/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["notes"], "follow up next week");

    let response = fx
        .app
        .oneshot(
            Request::builder()
                .uri("/meetings/meeting-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
