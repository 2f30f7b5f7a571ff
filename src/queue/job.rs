use crate::keys::SessionKey;
use crate::meeting::MeetingMeta;

/// One unit of background work: process a finalized meeting into a record,
/// a document, and delivered email.
#[derive(Debug, Clone)]
pub enum Job {
    /// Entry point for streamed audio chunks: list, download, and transcribe
    /// every chunk under the session prefix.
    ProcessChunks {
        session: SessionKey,
        meta: MeetingMeta,
    },
    /// Entry point for bot recordings: download the video, extract its
    /// audio, then rejoin the pipeline at the summarize stage. Carrying the
    /// URL keeps the slow download out of the webhook cycle.
    ProcessVideo {
        bot_id: String,
        video_url: String,
        meta: MeetingMeta,
    },
}

impl Job {
    /// Idempotency key: one in-flight job per session / bot at a time.
    pub fn key(&self) -> String {
        match self {
            Job::ProcessChunks { session, .. } => session.job_key(),
            Job::ProcessVideo { bot_id, .. } => format!("bot/{}", bot_id),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Job::ProcessChunks { session, .. } => format!("chunks for session {}", session),
            Job::ProcessVideo { bot_id, .. } => format!("video for bot {}", bot_id),
        }
    }
}
