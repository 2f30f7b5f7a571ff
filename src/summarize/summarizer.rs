use std::sync::Arc;
use tracing::{info, warn};

use super::model::{ChatModel, ChatOutcome, ChatRequest};
use super::summary::{MeetingSummary, SummaryValue};
use crate::schema::ResolvedSchema;

/// Failure classes for one summarization attempt. All of them abort the job.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("model declined to summarize: {0}")]
    Refused(String),
    #[error("model response was truncated by the output length limit")]
    Truncated,
    #[error("model output is missing required category {0:?}")]
    MissingCategory(String),
    #[error("model output is not a JSON object: {0}")]
    Malformed(String),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Turns a transcript plus a resolved schema into a `MeetingSummary`.
pub struct Summarizer {
    model: Arc<dyn ChatModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn summarize(
        &self,
        transcript: &str,
        schema: &ResolvedSchema,
    ) -> Result<MeetingSummary, SummarizeError> {
        if schema.categories.is_empty() {
            return Err(SummarizeError::Malformed(
                "resolved schema has no categories".to_string(),
            ));
        }

        let request = ChatRequest {
            system: build_system_prompt(schema),
            user: transcript.to_string(),
            schema_name: "meeting_summary".to_string(),
            schema: build_response_schema(schema),
        };

        info!(
            "Summarizing transcript ({} chars) into {} categories",
            transcript.len(),
            schema.categories.len()
        );

        match self.model.complete(request).await? {
            ChatOutcome::Content(content) => parse_summary(&content, schema),
            ChatOutcome::Refusal(reason) => {
                warn!("Summarizer refused: {}", reason);
                Err(SummarizeError::Refused(reason))
            }
            ChatOutcome::Truncated => Err(SummarizeError::Truncated),
        }
    }
}

/// Framing text followed by one `Category: instruction` line per output
/// field.
fn build_system_prompt(schema: &ResolvedSchema) -> String {
    let mut prompt = schema.framing.clone();

    for (name, instruction) in &schema.categories {
        prompt.push_str(name);
        prompt.push_str(": ");
        prompt.push_str(instruction);
        prompt.push('\n');
    }

    prompt.push_str(
        "Populate every field from the transcript. \
         If a field calls for multiple items, return them as a list of strings.\n",
    );

    prompt
}

/// JSON schema with one string-or-string-list property per category, all
/// required.
fn build_response_schema(schema: &ResolvedSchema) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    for (name, _) in &schema.categories {
        properties.insert(
            name.clone(),
            serde_json::json!({
                "anyOf": [
                    { "type": "string" },
                    { "type": "array", "items": { "type": "string" } }
                ]
            }),
        );
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": schema.category_names(),
        "additionalProperties": false,
    })
}

/// Validate the model output against the resolved category list and build the
/// summary in schema order. Any missing category rejects the whole output.
fn parse_summary(
    content: &str,
    schema: &ResolvedSchema,
) -> Result<MeetingSummary, SummarizeError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| SummarizeError::Malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| SummarizeError::Malformed("top-level value is not an object".to_string()))?;

    let mut fields = Vec::with_capacity(schema.categories.len());

    for (name, _) in &schema.categories {
        let field = object
            .get(name)
            .ok_or_else(|| SummarizeError::MissingCategory(name.clone()))?;

        let value = match field {
            serde_json::Value::String(text) => SummaryValue::Text(text.clone()),
            serde_json::Value::Array(items) => SummaryValue::Items(
                items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            other => SummaryValue::Text(other.to_string()),
        };

        fields.push((name.clone(), value));
    }

    Ok(MeetingSummary::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResolvedSchema;
    use anyhow::Result;

    fn schema(categories: &[&str]) -> ResolvedSchema {
        ResolvedSchema {
            framing: "Review this meeting.\n".to_string(),
            categories: categories
                .iter()
                .map(|name| (name.to_string(), format!("describe {}", name)))
                .collect(),
        }
    }

    struct CannedModel(ChatOutcome);

    #[async_trait::async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<ChatOutcome> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn parses_schema_shaped_output_in_order() {
        let summarizer = Summarizer::new(Arc::new(CannedModel(ChatOutcome::Content(
            r#"{"Action Items": ["a", "b"], "Tone": "productive"}"#.to_string(),
        ))));

        let summary = summarizer
            .summarize("transcript", &schema(&["Tone", "Action Items"]))
            .await
            .unwrap();

        assert_eq!(
            summary.fields()[0],
            ("Tone".to_string(), SummaryValue::Text("productive".to_string()))
        );
        assert_eq!(
            summary.fields()[1],
            (
                "Action Items".to_string(),
                SummaryValue::Items(vec!["a".to_string(), "b".to_string()])
            )
        );
    }

    #[tokio::test]
    async fn missing_category_is_rejected() {
        let summarizer = Summarizer::new(Arc::new(CannedModel(ChatOutcome::Content(
            r#"{"Tone": "fine"}"#.to_string(),
        ))));

        let err = summarizer
            .summarize("transcript", &schema(&["Tone", "Action Items"]))
            .await
            .unwrap_err();

        assert!(matches!(err, SummarizeError::MissingCategory(name) if name == "Action Items"));
    }

    #[tokio::test]
    async fn refusal_and_truncation_abort() {
        let refused = Summarizer::new(Arc::new(CannedModel(ChatOutcome::Refusal(
            "no".to_string(),
        ))));
        assert!(matches!(
            refused.summarize("t", &schema(&["Tone"])).await.unwrap_err(),
            SummarizeError::Refused(_)
        ));

        let truncated = Summarizer::new(Arc::new(CannedModel(ChatOutcome::Truncated)));
        assert!(matches!(
            truncated.summarize("t", &schema(&["Tone"])).await.unwrap_err(),
            SummarizeError::Truncated
        ));
    }

    #[test]
    fn system_prompt_contains_framing_and_categories() {
        let prompt = build_system_prompt(&schema(&["Tone"]));
        assert!(prompt.starts_with("Review this meeting.\n"));
        assert!(prompt.contains("Tone: describe Tone"));
    }
}
