//! Recap Core Library
//!
//! Turns an uploaded video into a transcript and a short summary: ffmpeg
//! extracts the audio, a remote ASR service transcribes it and a chat
//! completion model condenses the transcript.

pub mod artifacts;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod provider;
pub mod runner;
pub mod summarize;
pub mod transcribe;
pub mod types;

// Re-export commonly used items at crate root
pub use artifacts::{ArtifactKind, TempArtifact, TempArtifacts};
pub use error::{PipelineError, Result};
pub use extract::AudioExtractor;
pub use pipeline::{Pipeline, PipelineConfig};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use runner::{BinaryRunner, BinarySource, RunOptions, RunOutput, RunnerError};
pub use summarize::{ChatCompletionsSummarizer, SummarizationError, Summarizer, summarize};
pub use transcribe::{DeepgramTranscriber, Transcriber, TranscriptionError};
pub use types::{PipelineOutcome, SummaryResult, VideoUpload};
