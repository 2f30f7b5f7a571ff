use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub pipeline: PipelineConfig,
    pub transcription: TranscriptionConfig,
    pub summarizer: SummarizerConfig,
    pub email: EmailConfig,
    pub bot: BotConfig,
    /// Prompt schemas seeded into the schema store at startup.
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub org_id: String,
    /// Present for a personal schema, absent for a company-wide one.
    #[serde(default)]
    pub user_id: Option<String>,
    pub meeting_type: String,
    pub entries: Vec<SchemaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEntry {
    pub category: String,
    pub instruction: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory the artifact store maps object keys onto.
    pub root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Chunks with an index at or above this ceiling are dropped. Acts as a
    /// meeting-duration cap (480 x 15s chunks = 2 hours).
    #[serde(default = "default_max_chunk_index")]
    pub max_chunk_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Scratch directory for per-job workspaces.
    pub work_dir: String,
    /// Once transcript and summary are archived, the source chunks are
    /// considered disposable and deleted even if delivery failed. Set false
    /// to keep them.
    #[serde(default = "default_true")]
    pub delete_source_after_archive: bool,
    /// Attempts for the workspace deletion step.
    #[serde(default = "default_cleanup_retries")]
    pub cleanup_retries: u32,
    /// Fixed delay between workspace deletion attempts, in seconds.
    #[serde(default = "default_cleanup_delay_secs")]
    pub cleanup_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Segments shorter than this are rejected before any API call.
    #[serde(default = "default_min_audible_secs")]
    pub min_audible_secs: f64,
    /// Segment length when splitting long extracted audio, in seconds.
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_base: String,
    pub api_key: String,
    pub domain: String,
    pub from: String,
    /// Fixed recipient for delivery-failure notices.
    pub operator_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub api_base: String,
    pub api_key: String,
    pub bot_name: String,
    /// Shared secret for webhook signature verification (base64, svix-style).
    pub webhook_secret: String,
    /// Poll fallback when a "done" bot has no video yet and no further
    /// webhook arrives.
    #[serde(default = "default_retrieval_poll_secs")]
    pub retrieval_poll_secs: u64,
    #[serde(default = "default_retrieval_poll_attempts")]
    pub retrieval_poll_attempts: u32,
}

fn default_max_chunk_index() -> u32 {
    480
}

fn default_true() -> bool {
    true
}

fn default_cleanup_retries() -> u32 {
    3
}

fn default_cleanup_delay_secs() -> u64 {
    5
}

fn default_min_audible_secs() -> f64 {
    0.1
}

fn default_segment_secs() -> u64 {
    120
}

fn default_retrieval_poll_secs() -> u64 {
    60
}

fn default_retrieval_poll_attempts() -> u32 {
    10
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
