use async_trait::async_trait;
use serde_json::Value;

pub const DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com/v1";
pub const DEEPGRAM_MODEL: &str = "nova-2";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("response was not valid JSON: {0}")]
    InvalidResponse(String),
}

/// Remote speech recognition. One call per request, no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;
}

/// Deepgram pre-recorded transcription over plain REST.
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    language: String,
}

impl DeepgramTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEEPGRAM_BASE_URL.to_string(),
            model: DEEPGRAM_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        let url = format!("{}/listen", self.base_url.trim_end_matches('/'));

        tracing::debug!(
            model = %self.model,
            language = %self.language,
            bytes = audio.len(),
            "Sending audio to Deepgram"
        );

        let response = self
            .client
            .post(&url)
            .query(&[
                ("model", self.model.as_str()),
                ("language", self.language.as_str()),
                ("punctuate", "true"),
                ("smart_format", "true"),
            ])
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranscriptionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let response: Value = serde_json::from_str(&body)
            .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;

        let transcript = transcript_from_response(&response);

        tracing::info!(chars = transcript.len(), "Deepgram transcription completed");

        Ok(transcript)
    }
}

/// Pull the first alternative's transcript out of a Deepgram response.
/// Anything missing along the way yields an empty transcript.
pub fn transcript_from_response(response: &Value) -> String {
    response["results"]["channels"][0]["alternatives"][0]["transcript"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_string()
}
