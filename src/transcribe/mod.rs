//! Speech-to-text client
//!
//! One audio segment in, one block of text out. The only recoverable failure
//! class is the provider rejecting the container format, which gets a single
//! re-encode-and-retry; everything else propagates and aborts the job.

mod whisper_api;

pub use whisper_api::WhisperApiClient;

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use crate::media;

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    /// The provider rejected the audio container/codec. Worth one re-encode.
    #[error("invalid audio format: {0}")]
    InvalidFormat(String),
    /// The segment is shorter than the minimum audible duration; no API call
    /// was made.
    #[error("audio segment too short to transcribe ({0:.2}s)")]
    TooShort(f64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Converts one audio segment to text.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscribeError>;
}

/// Transcribe one segment with the duration guard and the single
/// invalid-format retry applied.
pub async fn transcribe_segment(
    transcriber: &dyn Transcriber,
    audio_path: &Path,
    min_audible_secs: f64,
) -> Result<String, TranscribeError> {
    // The guard is an optimization: when no duration can be probed the
    // segment goes to the provider anyway and gets the authoritative answer.
    match media::probe_duration(audio_path).await {
        Ok(Some(duration)) if duration < min_audible_secs => {
            return Err(TranscribeError::TooShort(duration));
        }
        Ok(Some(_)) => {}
        Ok(None) => info!("No duration reported for {:?}, skipping guard", audio_path),
        Err(e) => warn!("Could not probe duration of {:?}: {:#}", audio_path, e),
    }

    match transcriber.transcribe(audio_path).await {
        Ok(text) => Ok(text),
        Err(TranscribeError::InvalidFormat(reason)) => {
            warn!(
                "Transcription rejected {:?} as invalid format ({}), re-encoding once",
                audio_path, reason
            );
            media::reencode_audio(audio_path).await?;
            let text = transcriber.transcribe(audio_path).await?;
            info!("Retry after re-encode succeeded for {:?}", audio_path);
            Ok(text)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTranscriber(String);

    #[async_trait::async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String, TranscribeError> {
            Ok(self.0.clone())
        }
    }

    // A file ffmpeg cannot report a duration for (or a missing ffmpeg
    // entirely) must skip the guard, not read as a zero-length segment.
    #[tokio::test]
    async fn test_unprobeable_segment_still_reaches_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragment.webm");
        tokio::fs::write(&path, b"not-a-real-container").await.unwrap();

        let transcriber = FixedTranscriber("hello there".to_string());
        let text = transcribe_segment(&transcriber, &path, 0.1).await.unwrap();
        assert_eq!(text, "hello there");
    }
}
