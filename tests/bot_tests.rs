// Bot lifecycle tests: status webhooks drive retrieval, and retrieval hands
// exactly one processing job to the worker no matter how often "done" is
// reported. The webhook cycle never downloads anything itself.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use morph_meetings::bot::{
    BotDetails, BotManager, BotProvider, BotStore, CreateBotRequest, CreatedBot, RequestBot,
    StatusChange, StatusOutcome, STATUS_PENDING,
};
use morph_meetings::meeting::MeetingMeta;
use morph_meetings::queue::{Job, JobQueue, JobRunner, Worker};

const VIDEO_URL: &str = "https://cdn.example.com/recording.mp4";

struct MockProvider {
    video_ready: AtomicBool,
    created: AtomicUsize,
    downloads: AtomicUsize,
}

impl MockProvider {
    fn new(video_ready: bool) -> Self {
        Self {
            video_ready: AtomicBool::new(video_ready),
            created: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl BotProvider for MockProvider {
    async fn create_bot(&self, _request: CreateBotRequest) -> Result<CreatedBot> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedBot {
            id: format!("bot-{}", n + 1),
        })
    }

    async fn get_bot(&self, bot_id: &str) -> Result<BotDetails> {
        Ok(BotDetails {
            id: bot_id.to_string(),
            video_url: if self.video_ready.load(Ordering::SeqCst) {
                Some(VIDEO_URL.to_string())
            } else {
                None
            },
        })
    }

    async fn download_video(&self, _video_url: &str) -> Result<Vec<u8>> {
        // Deliberately slow, like a real multi-hundred-MB recording.
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(b"fake-mp4-payload".to_vec())
    }
}

/// Records the video jobs the worker executes.
#[derive(Default)]
struct CollectingRunner {
    jobs: Mutex<Vec<(String, String)>>,
}

impl CollectingRunner {
    fn video_jobs(&self) -> Vec<(String, String)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl JobRunner for CollectingRunner {
    async fn run(&self, job: Job) -> Result<()> {
        if let Job::ProcessVideo {
            bot_id, video_url, ..
        } = job
        {
            self.jobs.lock().unwrap().push((bot_id, video_url));
        }
        Ok(())
    }
}

fn meta() -> MeetingMeta {
    MeetingMeta {
        org_id: "org-1".to_string(),
        user_id: "host-1".to_string(),
        meeting_type: "General".to_string(),
        meeting_name: "All hands".to_string(),
        duration: String::new(),
        date: "2025-01-10".to_string(),
        attendees: vec![],
    }
}

fn request() -> RequestBot {
    RequestBot {
        meeting_url: "https://meet.example.com/abc".to_string(),
        calendar_event_id: None,
        join_at: None,
        meta: meta(),
    }
}

fn done_event(bot_id: &str) -> StatusChange {
    StatusChange {
        bot_id: bot_id.to_string(),
        code: "done".to_string(),
        created_at: Some("2025-01-10T17:00:00Z".to_string()),
        sub_code: None,
        message: None,
        recording_id: Some("rec-1".to_string()),
    }
}

struct Fixture {
    manager: Arc<BotManager>,
    runner: Arc<CollectingRunner>,
    provider: Arc<MockProvider>,
}

fn fixture(provider: MockProvider) -> Result<Fixture> {
    let provider = Arc::new(provider);
    let (queue, receiver) = JobQueue::new(16);
    let runner = Arc::new(CollectingRunner::default());
    tokio::spawn(Worker::new(receiver, Arc::clone(&runner) as Arc<dyn JobRunner>).run());

    let manager = Arc::new(BotManager::new(
        Arc::clone(&provider) as Arc<dyn BotProvider>,
        Arc::new(BotStore::new()),
        queue,
        "Test Notetaker".to_string(),
        Duration::from_secs(60),
        1,
    ));

    Ok(Fixture {
        manager,
        runner,
        provider,
    })
}

async fn wait_for_jobs(runner: &CollectingRunner, count: usize) {
    for _ in 0..100 {
        if runner.video_jobs().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_requested_bot_starts_pending() -> Result<()> {
    let fx = fixture(MockProvider::new(false))?;

    let record = fx.manager.request_bot(request()).await?;

    assert_eq!(record.bot_id, "bot-1");
    assert_eq!(record.status, STATUS_PENDING);
    assert!(record.video_url.is_none());

    Ok(())
}

#[tokio::test]
async fn test_done_status_dispatches_job_with_video_url() -> Result<()> {
    let fx = fixture(MockProvider::new(true))?;
    fx.manager.request_bot(request()).await?;

    let outcome = fx
        .manager
        .clone()
        .handle_status_change(done_event("bot-1"))
        .await?;
    assert_eq!(outcome, StatusOutcome::Updated);

    wait_for_jobs(&fx.runner, 1).await;
    let jobs = fx.runner.video_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, "bot-1");
    assert_eq!(jobs[0].1, VIDEO_URL);

    let record = fx.manager.store().get("bot-1").await.unwrap();
    assert_eq!(record.status, "done");
    assert_eq!(record.recording_id.as_deref(), Some("rec-1"));
    assert_eq!(record.video_url.as_deref(), Some(VIDEO_URL));

    Ok(())
}

#[tokio::test]
async fn test_status_handling_never_waits_on_the_download() -> Result<()> {
    let fx = fixture(MockProvider::new(true))?;
    fx.manager.request_bot(request()).await?;

    // The mock's download takes 500ms; handling the event must not.
    let started = Instant::now();
    fx.manager
        .clone()
        .handle_status_change(done_event("bot-1"))
        .await?;
    assert!(started.elapsed() < Duration::from_millis(400));

    // The download belongs to the pipeline job, not this path at all.
    assert_eq!(fx.provider.downloads.load(Ordering::SeqCst), 0);

    wait_for_jobs(&fx.runner, 1).await;
    assert_eq!(fx.runner.video_jobs()[0].1, VIDEO_URL);

    Ok(())
}

#[tokio::test]
async fn test_repeated_done_events_dispatch_one_job() -> Result<()> {
    let fx = fixture(MockProvider::new(true))?;
    fx.manager.request_bot(request()).await?;

    fx.manager
        .clone()
        .handle_status_change(done_event("bot-1"))
        .await?;
    wait_for_jobs(&fx.runner, 1).await;

    // The provider resends "done"; the recorded video URL short-circuits
    // another dispatch.
    fx.manager
        .clone()
        .handle_status_change(done_event("bot-1"))
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(fx.runner.video_jobs().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_done_without_video_dispatches_nothing_yet() -> Result<()> {
    let fx = fixture(MockProvider::new(false))?;
    fx.manager.request_bot(request()).await?;

    let outcome = fx
        .manager
        .clone()
        .handle_status_change(done_event("bot-1"))
        .await?;
    assert_eq!(outcome, StatusOutcome::Updated);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fx.runner.video_jobs().is_empty());

    // The status update itself still lands.
    assert_eq!(fx.manager.store().get("bot-1").await.unwrap().status, "done");

    Ok(())
}

#[tokio::test]
async fn test_status_for_unknown_bot_is_not_found() -> Result<()> {
    let fx = fixture(MockProvider::new(true))?;

    let outcome = fx
        .manager
        .clone()
        .handle_status_change(done_event("bot-ghost"))
        .await?;
    assert_eq!(outcome, StatusOutcome::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_intermediate_statuses_overwrite_last_write_wins() -> Result<()> {
    let fx = fixture(MockProvider::new(false))?;
    fx.manager.request_bot(request()).await?;

    for code in ["joining_call", "in_call_recording", "call_ended"] {
        let mut event = done_event("bot-1");
        event.code = code.to_string();
        event.recording_id = None;
        fx.manager.clone().handle_status_change(event).await?;
    }

    let record = fx.manager.store().get("bot-1").await.unwrap();
    assert_eq!(record.status, "call_ended");
    assert!(record.recording_id.is_none());

    Ok(())
}
