use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::SummarizerConfig;

/// One structured-output chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    /// JSON schema the response must conform to.
    pub schema_name: String,
    pub schema: serde_json::Value,
}

/// Outcome of a chat completion, separating the failure classes the pipeline
/// cares about from transport errors.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    /// Raw JSON content conforming to the requested schema.
    Content(String),
    /// The model declined to answer.
    Refusal(String),
    /// The response was cut off by the output length limit.
    Truncated,
}

/// A chat model that can produce schema-constrained output.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatOutcome>;
}

// ============================================================================
// OpenAI-compatible implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionPayload {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
    response_format: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(config: &SummarizerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatOutcome> {
        let url = format!("{}/chat/completions", self.api_base);

        let payload = CompletionPayload {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system",
                    content: request.system,
                },
                Message {
                    role: "user",
                    content: request.user,
                },
            ],
            response_format: serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                }
            }),
        };

        debug!("Requesting chat completion from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read chat completion response")?;

        if !status.is_success() {
            error!("Chat completion failed with status {}: {}", status, body);
            anyhow::bail!("Chat completion failed with status {}", status);
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).context("Failed to parse chat completion response")?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .context("Chat completion response had no choices")?;

        if let Some(refusal) = choice.message.refusal {
            return Ok(ChatOutcome::Refusal(refusal));
        }

        if choice.finish_reason.as_deref() == Some("length") {
            return Ok(ChatOutcome::Truncated);
        }

        let content = choice
            .message
            .content
            .context("Chat completion choice had no content")?;

        info!("Chat completion received: {} chars", content.len());

        Ok(ChatOutcome::Content(content))
    }
}
