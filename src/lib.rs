pub mod bot;
pub mod calendar;
pub mod config;
pub mod delivery;
pub mod document;
pub mod http;
pub mod ingest;
pub mod keys;
pub mod media;
pub mod meeting;
pub mod pipeline;
pub mod queue;
pub mod schema;
pub mod storage;
pub mod summarize;
pub mod transcribe;

pub use bot::{BotManager, BotProvider, BotStore, RecallClient};
pub use calendar::{CalendarAccounts, CalendarProvider, CalendarScheduler, RecallCalendarClient};
pub use config::Config;
pub use delivery::{Mailer, MailgunMailer};
pub use http::{create_router, AppState};
pub use ingest::ChunkBuffer;
pub use keys::SessionKey;
pub use meeting::{MeetingMeta, MeetingRecord, MeetingStore};
pub use pipeline::{Pipeline, PipelineDeps, PipelineSettings};
pub use queue::{JobQueue, Worker};
pub use schema::{PromptSchema, ResolvedSchema, SchemaStore};
pub use storage::{ArtifactStore, FsArtifactStore};
pub use summarize::{MeetingSummary, Summarizer};
pub use transcribe::{Transcriber, WhisperApiClient};
