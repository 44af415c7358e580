use std::path::PathBuf;
use thiserror::Error;

use crate::transcribe::TranscriptionError;

/// Fatal failures of a pipeline run.
///
/// Summarization never appears here: a failed summary is folded into the
/// outcome as diagnostic text instead of aborting the request.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Transcoding binary unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to save uploaded video to {path}: {source}")]
    VideoSaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    #[error("Failed to read extracted audio {path}: {source}")]
    ArtifactReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(#[from] TranscriptionError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
