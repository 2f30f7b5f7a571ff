use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info};

use super::{TranscribeError, Transcriber};
use crate::config::TranscriptionConfig;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
pub struct WhisperApiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl WhisperApiClient {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperApiClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscribeError> {
        let url = format!("{}/audio/transcriptions", self.api_base);

        let bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio segment {:?}", audio_path))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.webm".to_string());

        debug!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), url);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send transcription request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read transcription response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.clone());

            if message.contains("Invalid file format") {
                return Err(TranscribeError::InvalidFormat(message));
            }

            error!("Transcription failed with status {}: {}", status, message);
            return Err(TranscribeError::Other(anyhow!(
                "Transcription request failed with status {}: {}",
                status,
                message
            )));
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).context("Failed to parse transcription response")?;

        info!(
            "Transcribed {:?}: {} chars",
            audio_path,
            parsed.text.len()
        );

        Ok(parsed.text.trim().to_string())
    }
}
