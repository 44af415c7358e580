use async_trait::async_trait;
use serde_json::Value;

use crate::{provider::Provider, types::SummaryResult};

/// Prefix of the text that stands in for a summary the service could not produce.
pub const SUMMARY_ERROR_PREFIX: &str = "Error generating summary";

#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Remote text generation used to condense a transcript.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizationError>;
}

pub fn summary_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following transcript in at most three sentences. \
         Reply with the summary only.\n\nTranscript:\n{}",
        transcript
    )
}

/// Run the summarization stage. Failures never escape: they are turned into a
/// degraded summary carrying the cause.
pub async fn summarize(summarizer: &dyn Summarizer, transcript: &str) -> SummaryResult {
    match summarizer.summarize(transcript).await {
        Ok(summary) => SummaryResult::Generated(summary),
        Err(e) => {
            tracing::warn!(error = %e, "Summarization failed, returning degraded summary");
            SummaryResult::Degraded(format!("{}: {}", SUMMARY_ERROR_PREFIX, e))
        }
    }
}

/// Summaries from any OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsSummarizer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsSummarizer {
    pub fn new(api_url: impl Into<String>, api_key: String, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            model: model.into(),
        }
    }

    pub fn for_provider(provider: Provider, api_key: String, model: Option<String>) -> Self {
        let config = provider.config();
        Self::new(
            config.api_url,
            api_key,
            model.unwrap_or_else(|| config.model.to_string()),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for ChatCompletionsSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizationError> {
        tracing::debug!(model = %self.model, chars = transcript.len(), "Requesting summary");

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": summary_prompt(transcript),
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SummarizationError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<Value>().await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                SummarizationError::InvalidResponse(format!("no completion content in {}", response))
            })?;

        tracing::info!(chars = content.len(), "Summary generated");

        Ok(content.trim().to_string())
    }
}
