use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use recap_core::{
    ChatCompletionsSummarizer, DeepgramTranscriber, Pipeline, PipelineConfig, Provider,
    ProviderError, transcribe::{DEEPGRAM_MODEL, DEFAULT_LANGUAGE},
};

pub const DEFAULT_MAX_UPLOAD_MB: usize = 200;

/// Every setting can come from the command line or the environment (`.env`
/// included). Read once at startup.
#[derive(Parser, Debug, Clone)]
#[command(name = "recap-server")]
#[command(about = "Upload a video, get back its transcript and a short summary")]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Deepgram API key used for transcription
    #[arg(long, env = "DEEPGRAM_API_KEY", hide_env_values = true)]
    pub deepgram_api_key: String,

    /// Deepgram model
    #[arg(long, env = "DEEPGRAM_MODEL", default_value = DEEPGRAM_MODEL)]
    pub deepgram_model: String,

    /// Spoken language hint sent with each transcription
    #[arg(long, env = "TRANSCRIPTION_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Summary backend: openai, groq, grok or gemini
    #[arg(long, env = "SUMMARY_PROVIDER", default_value = "openai")]
    pub provider: Provider,

    /// API key for the summary backend; defaults to the provider's own variable
    /// (OPENAI_API_KEY, GROQ_API_KEY, ...)
    #[arg(long, env = "SUMMARY_API_KEY", hide_env_values = true)]
    pub summary_api_key: Option<String>,

    /// Model used for summaries; defaults to the provider's model
    #[arg(long, env = "SUMMARY_MODEL")]
    pub summary_model: Option<String>,

    /// Chat completions endpoint; defaults to the provider's endpoint
    #[arg(long, env = "SUMMARY_API_URL")]
    pub summary_api_url: Option<String>,

    /// Explicit ffmpeg binary; otherwise a bundled copy, then PATH
    #[arg(long, env = "FFMPEG_PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Directory for request-scoped temp files (defaults to the OS temp dir)
    #[arg(long, env = "RECAP_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Deadline for a single transcode, in seconds (none by default)
    #[arg(long, env = "TRANSCODE_TIMEOUT_SECS")]
    pub transcode_timeout_secs: Option<u64>,

    /// Largest accepted upload, in MiB
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,
}

impl ServerArgs {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            transcode_timeout: self.transcode_timeout_secs.map(Duration::from_secs),
            ..PipelineConfig::default()
        };
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = dir.clone();
        }
        config
    }

    /// Build the service clients once and wire them into a pipeline.
    pub fn build_pipeline(&self) -> Result<Pipeline, ProviderError> {
        let summary_api_key = match &self.summary_api_key {
            Some(key) => key.clone(),
            None => self.provider.api_key_from_env()?,
        };

        let transcriber = DeepgramTranscriber::new(self.deepgram_api_key.clone())
            .with_model(self.deepgram_model.clone())
            .with_language(self.language.clone());

        let mut summarizer = ChatCompletionsSummarizer::for_provider(
            self.provider,
            summary_api_key.clone(),
            self.summary_model.clone(),
        );
        if let Some(url) = &self.summary_api_url {
            summarizer = ChatCompletionsSummarizer::new(
                url.clone(),
                summary_api_key,
                summarizer.model().to_string(),
            );
        }

        tracing::info!(
            provider = self.provider.name(),
            summary_model = summarizer.model(),
            transcription_model = %self.deepgram_model,
            "Service clients configured"
        );

        Ok(Pipeline::new(
            self.pipeline_config(),
            Arc::new(transcriber),
            Arc::new(summarizer),
        ))
    }
}
