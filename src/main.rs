use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use morph_meetings::bot::{BotManager, BotProvider, BotStore, RecallClient};
use morph_meetings::calendar::{CalendarAccounts, CalendarScheduler, RecallCalendarClient};
use morph_meetings::delivery::MailgunMailer;
use morph_meetings::ingest::ChunkBuffer;
use morph_meetings::meeting::InMemoryMeetingStore;
use morph_meetings::queue::{JobQueue, Worker};
use morph_meetings::schema::{InMemorySchemaStore, PromptSchema};
use morph_meetings::storage::FsArtifactStore;
use morph_meetings::summarize::{OpenAiChatModel, Summarizer};
use morph_meetings::transcribe::WhisperApiClient;
use morph_meetings::{
    create_router, AppState, ArtifactStore, Config, MeetingStore, Pipeline, PipelineDeps,
    PipelineSettings, SchemaStore, Transcriber,
};

#[derive(Parser)]
#[command(name = "morph-meetings", about = "Meeting capture and processing service")]
struct Args {
    /// Config file path (without extension), resolved by the config loader.
    #[arg(long, default_value = "config/morph-meetings")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);

    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&cfg.storage.root)?);
    let meetings: Arc<dyn MeetingStore> = Arc::new(InMemoryMeetingStore::new());

    let schema_store = InMemorySchemaStore::new();
    for entry in &cfg.schemas {
        let schema = PromptSchema::new(
            &entry.meeting_type,
            entry
                .entries
                .iter()
                .map(|e| (e.category.clone(), e.instruction.clone()))
                .collect(),
        );
        match &entry.user_id {
            Some(user_id) => schema_store.insert_personal(&entry.org_id, user_id, schema).await,
            None => schema_store.insert_company(&entry.org_id, schema).await,
        }
    }
    info!("Seeded {} prompt schemas", cfg.schemas.len());
    let schemas: Arc<dyn SchemaStore> = Arc::new(schema_store);

    let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperApiClient::new(&cfg.transcription));
    let summarizer = Summarizer::new(Arc::new(OpenAiChatModel::new(&cfg.summarizer)));
    let mailer = Arc::new(MailgunMailer::new(&cfg.email));

    let (queue, receiver) = JobQueue::new(64);

    let recall: Arc<dyn BotProvider> = Arc::new(RecallClient::new(&cfg.bot));

    let pipeline = Pipeline::new(
        PipelineDeps {
            store: Arc::clone(&store),
            transcriber,
            schemas,
            summarizer,
            meetings: Arc::clone(&meetings),
            mailer,
            recordings: Arc::clone(&recall),
        },
        PipelineSettings::from_config(&cfg),
    );
    let worker = Worker::new(receiver, Arc::new(pipeline));
    tokio::spawn(worker.run());

    let bots = Arc::new(BotManager::new(
        recall,
        Arc::new(BotStore::new()),
        queue.clone(),
        cfg.bot.bot_name.clone(),
        Duration::from_secs(cfg.bot.retrieval_poll_secs),
        cfg.bot.retrieval_poll_attempts,
    ));

    let scheduler = Arc::new(CalendarScheduler::new(
        Arc::new(RecallCalendarClient::new(&cfg.bot)),
        Arc::new(CalendarAccounts::new()),
        Arc::clone(&bots),
    ));

    let buffer = Arc::new(ChunkBuffer::new(
        Arc::clone(&store),
        cfg.ingest.max_chunk_index,
    ));

    let state = AppState {
        buffer,
        queue,
        bots,
        scheduler,
        meetings,
        webhook_secret: cfg.bot.webhook_secret.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
