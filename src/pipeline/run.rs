use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::assemble::assemble_transcript;
use super::workspace::Workspace;
use crate::bot::BotProvider;
use crate::config::Config;
use crate::delivery::{deliver_summary, Mailer};
use crate::document::render_markdown;
use crate::keys::{chunk_index_of, SessionKey};
use crate::media;
use crate::meeting::{MeetingMeta, MeetingRecord, MeetingStore};
use crate::queue::{Job, JobRunner};
use crate::schema::{resolve_for, SchemaStore};
use crate::storage::ArtifactStore;
use crate::summarize::Summarizer;
use crate::transcribe::{transcribe_segment, TranscribeError, Transcriber};

/// The collaborators a pipeline run talks to.
pub struct PipelineDeps {
    pub store: Arc<dyn ArtifactStore>,
    pub transcriber: Arc<dyn Transcriber>,
    pub schemas: Arc<dyn SchemaStore>,
    pub summarizer: Summarizer,
    pub meetings: Arc<dyn MeetingStore>,
    pub mailer: Arc<dyn Mailer>,
    /// Source of bot recording downloads; fetching happens inside the job,
    /// never in the webhook cycle that dispatched it.
    pub recordings: Arc<dyn BotProvider>,
}

/// Tunables lifted out of the config file.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub work_dir: PathBuf,
    /// "Archival success implies source-chunk disposability": delete source
    /// chunks once transcript and summary are archived, regardless of
    /// delivery outcome.
    pub delete_source_after_archive: bool,
    pub cleanup_retries: u32,
    pub cleanup_delay: Duration,
    pub min_audible_secs: f64,
    pub segment_secs: u64,
    pub operator_address: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_dir: PathBuf::from(&config.pipeline.work_dir),
            delete_source_after_archive: config.pipeline.delete_source_after_archive,
            cleanup_retries: config.pipeline.cleanup_retries,
            cleanup_delay: Duration::from_secs(config.pipeline.cleanup_delay_secs),
            min_audible_secs: config.transcription.min_audible_secs,
            segment_secs: config.transcription.segment_secs,
            operator_address: config.email.operator_address.clone(),
        }
    }
}

/// Executes the processing stages for one job, in strict order. The first
/// unrecoverable stage error aborts the remainder; no partial meeting record
/// is left behind and source chunks stay in place.
pub struct Pipeline {
    deps: PipelineDeps,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, settings: PipelineSettings) -> Self {
        Self { deps, settings }
    }

    async fn process_chunks(&self, session: SessionKey, meta: MeetingMeta) -> Result<()> {
        let prefix = session.prefix();
        let keys = self.deps.store.list(&prefix).await?;

        if keys.is_empty() {
            // Nothing was captured: the job ends silently, no meeting is
            // recorded.
            info!("No chunk artifacts under {}, nothing to process", prefix);
            return Ok(());
        }

        info!("Found {} chunk artifacts under {}", keys.len(), prefix);

        let job_id = uuid::Uuid::new_v4().to_string();
        let workspace = Workspace::create(&self.settings.work_dir, &job_id).await?;

        let transcript = match self.transcribe_chunks(&workspace, &session, &keys).await {
            Ok(transcript) => transcript,
            Err(e) => {
                self.cleanup(workspace).await;
                return Err(e);
            }
        };

        self.finish(workspace, session, Some(keys), meta, transcript)
            .await
    }

    async fn transcribe_chunks(
        &self,
        workspace: &Workspace,
        session: &SessionKey,
        keys: &[String],
    ) -> Result<String> {
        let chunk_dir = workspace.subdir("chunks").await?;

        // Restore recording order from the numeric index regardless of
        // arrival or listing order.
        let mut ordered: Vec<(u32, String)> = keys
            .iter()
            .filter_map(|key| chunk_index_of(key).map(|index| (index, key.clone())))
            .collect();
        ordered.sort_by_key(|(index, _)| *index);

        let mut pieces = Vec::with_capacity(ordered.len());
        for (index, key) in &ordered {
            let bytes = self.deps.store.get(key).await?;
            let file_name = key.rsplit('/').next().unwrap_or("chunk.webm");
            let path = chunk_dir.join(file_name);
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to download chunk {} to workspace", key))?;

            match transcribe_segment(
                self.deps.transcriber.as_ref(),
                &path,
                self.settings.min_audible_secs,
            )
            .await
            {
                Ok(text) => pieces.push((*index, text)),
                Err(TranscribeError::TooShort(duration)) => {
                    warn!(
                        "Skipping chunk {} ({:.2}s, below audible minimum)",
                        key, duration
                    );
                }
                Err(e) => return Err(e).context(format!("Failed to transcribe chunk {}", key)),
            }
        }

        let transcript = assemble_transcript(pieces);
        let transcript_path = workspace.join(format!("{}.txt", session.artifact_stem()));
        tokio::fs::write(&transcript_path, &transcript)
            .await
            .context("Failed to write assembled transcript")?;
        info!("Assembled transcript: {} chars", transcript.len());

        Ok(transcript)
    }

    async fn process_video(
        &self,
        bot_id: String,
        video_url: String,
        meta: MeetingMeta,
    ) -> Result<()> {
        let workspace = Workspace::create(&self.settings.work_dir, &bot_id).await?;

        let transcript = match self.fetch_and_transcribe(&workspace, &bot_id, &video_url).await {
            Ok(transcript) => transcript,
            Err(e) => {
                self.cleanup(workspace).await;
                return Err(e);
            }
        };

        // Bot recordings have no chunk session; artifact names derive from
        // the requesting user and meeting type instead.
        let artifact_session =
            SessionKey::new(&meta.user_id, &meta.meeting_type, &meta.date);

        self.finish(workspace, artifact_session, None, meta, transcript)
            .await
    }

    async fn fetch_and_transcribe(
        &self,
        workspace: &Workspace,
        bot_id: &str,
        video_url: &str,
    ) -> Result<String> {
        // Downloaded into the workspace so cleanup covers it.
        let bytes = self.deps.recordings.download_video(video_url).await?;
        let local_video = workspace.join(format!("{}.mp4", bot_id));
        tokio::fs::write(&local_video, &bytes)
            .await
            .with_context(|| format!("Failed to write video for bot {}", bot_id))?;
        info!("Downloaded bot {} recording ({} bytes)", bot_id, bytes.len());

        let audio_path = media::extract_audio(&local_video).await?;

        let duration = media::probe_duration(&audio_path).await?.unwrap_or(0.0);
        let segments = if duration > self.settings.segment_secs as f64 {
            media::segment_audio(&audio_path, self.settings.segment_secs).await?
        } else {
            vec![audio_path]
        };

        info!(
            "Transcribing bot {} recording: {:.1}s in {} segment(s)",
            bot_id,
            duration,
            segments.len()
        );

        // A failed segment contributes nothing rather than aborting the
        // whole recording.
        let mut pieces = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            match transcribe_segment(
                self.deps.transcriber.as_ref(),
                segment,
                self.settings.min_audible_secs,
            )
            .await
            {
                Ok(text) => pieces.push((index as u32, text)),
                Err(e) => warn!("Failed to transcribe segment {:?}: {:#}", segment, e),
            }
        }

        Ok(assemble_transcript(pieces))
    }

    /// Stages shared by both entry points: summarize, render, deliver,
    /// archive, clean up. The workspace is removed whether or not the stages
    /// succeed; source chunks are only deleted after a successful archive.
    async fn finish(
        &self,
        workspace: Workspace,
        session: SessionKey,
        source_chunks: Option<Vec<String>>,
        meta: MeetingMeta,
        transcript: String,
    ) -> Result<()> {
        let archived = self.summarize_and_archive(&session, &meta, &transcript).await;

        self.cleanup(workspace).await;
        archived?;

        if let Some(keys) = source_chunks {
            if self.settings.delete_source_after_archive {
                info!("Deleting {} source chunk artifacts", keys.len());
                self.deps.store.delete(&keys).await?;
            } else {
                info!("Keeping {} source chunk artifacts (policy)", keys.len());
            }
        }

        Ok(())
    }

    async fn summarize_and_archive(
        &self,
        session: &SessionKey,
        meta: &MeetingMeta,
        transcript: &str,
    ) -> Result<()> {
        let schema = resolve_for(
            self.deps.schemas.as_ref(),
            &meta.org_id,
            &meta.meeting_type,
            &meta.user_id,
        )
        .await?;

        let summary = self.deps.summarizer.summarize(transcript, &schema).await?;

        // The durable meeting record is written here, inside the summarize
        // stage; summary persistence and delivery are not atomic with each
        // other.
        let record = MeetingRecord::new(meta, transcript.to_string(), summary.clone());
        let record_id = record.id.clone();
        self.deps.meetings.add(record).await?;
        info!("Stored meeting record {}", record_id);

        let title = format!("{} - {}", meta.meeting_name, meta.date);
        let document = render_markdown(&title, &summary);

        deliver_summary(
            self.deps.mailer.as_ref(),
            &self.settings.operator_address,
            meta,
            &document,
        )
        .await;

        self.deps
            .store
            .put(&session.transcript_artifact(), transcript.as_bytes())
            .await
            .context("Failed to archive raw transcript")?;
        self.deps
            .store
            .put(&session.summary_artifact(), summary.to_json().as_bytes())
            .await
            .context("Failed to archive summary")?;
        info!(
            "Archived {} and {}",
            session.transcript_artifact(),
            session.summary_artifact()
        );

        Ok(())
    }

    /// Best-effort workspace removal, shared by the success and failure
    /// paths.
    async fn cleanup(&self, workspace: Workspace) {
        workspace
            .remove_with_retries(self.settings.cleanup_retries, self.settings.cleanup_delay)
            .await;
    }
}

#[async_trait::async_trait]
impl JobRunner for Pipeline {
    async fn run(&self, job: Job) -> Result<()> {
        match job {
            Job::ProcessChunks { session, meta } => self.process_chunks(session, meta).await,
            Job::ProcessVideo {
                bot_id,
                video_url,
                meta,
            } => self.process_video(bot_id, video_url, meta).await,
        }
    }
}
