use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::BotConfig;

/// Parameters for requesting a recording agent.
#[derive(Debug, Clone, Serialize)]
pub struct CreateBotRequest {
    pub meeting_url: String,
    pub bot_name: String,
    pub recording_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedBot {
    pub id: String,
}

/// Bot details as reported by the provider. `video_url` appears only once
/// the recording is ready.
#[derive(Debug, Clone, Deserialize)]
pub struct BotDetails {
    pub id: String,
    pub video_url: Option<String>,
}

/// The third-party recording agent API.
#[async_trait::async_trait]
pub trait BotProvider: Send + Sync {
    async fn create_bot(&self, request: CreateBotRequest) -> Result<CreatedBot>;

    async fn get_bot(&self, bot_id: &str) -> Result<BotDetails>;

    /// Fetch the finished recording itself.
    async fn download_video(&self, video_url: &str) -> Result<Vec<u8>>;
}

/// Recall-style HTTP client for the bot API.
pub struct RecallClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl RecallClient {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl BotProvider for RecallClient {
    async fn create_bot(&self, request: CreateBotRequest) -> Result<CreatedBot> {
        let url = format!("{}/bot/", self.api_base);

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send bot create request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read bot create response")?;

        if !status.is_success() {
            error!("Bot create failed with status {}: {}", status, body);
            anyhow::bail!("Bot create failed with status {}", status);
        }

        let created: CreatedBot =
            serde_json::from_str(&body).context("Failed to parse bot create response")?;

        info!("Bot {} created for {}", created.id, request.meeting_url);

        Ok(created)
    }

    async fn get_bot(&self, bot_id: &str) -> Result<BotDetails> {
        let url = format!("{}/bot/{}", self.api_base, bot_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .send()
            .await
            .context("Failed to send bot details request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Bot details request for {} failed with status {}", bot_id, status);
        }

        response
            .json::<BotDetails>()
            .await
            .context("Failed to parse bot details response")
    }

    async fn download_video(&self, video_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(video_url)
            .send()
            .await
            .context("Failed to request recording video")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Video download failed with status {}", status);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read recording video body")?;

        Ok(bytes.to_vec())
    }
}
