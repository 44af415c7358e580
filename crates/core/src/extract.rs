use std::{ffi::OsString, path::Path, time::Duration};

use crate::{
    artifacts::{ArtifactKind, TempArtifact, TempArtifacts},
    error::{PipelineError, Result},
    runner::{BinaryRunner, RunOptions, RunnerError},
};

pub const SAMPLE_RATE: u32 = 16_000;
pub const CHANNELS: u32 = 1;
pub const AUDIO_CODEC: &str = "pcm_s16le";

/// Turns an uploaded video into mono 16kHz PCM WAV suitable for ASR.
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    runner: BinaryRunner,
    options: RunOptions,
}

impl AudioExtractor {
    pub fn new(runner: BinaryRunner, options: RunOptions) -> Self {
        Self { runner, options }
    }

    pub fn runner(&self) -> &BinaryRunner {
        &self.runner
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }

    /// Extract the audio track of `video` into a freshly allocated artifact.
    ///
    /// On failure the audio handle is dropped here, so a partially written
    /// file never outlives the call.
    pub async fn extract(
        &self,
        video: &TempArtifact,
        artifacts: &TempArtifacts,
    ) -> Result<TempArtifact> {
        let audio = artifacts.allocate(ArtifactKind::Audio, "wav");
        let args = extraction_args(video.path(), audio.path());

        tracing::debug!(
            binary = %self.runner.binary().display(),
            input = %video.path().display(),
            output = %audio.path().display(),
            "Extracting audio"
        );

        self.runner
            .run(&args, self.options)
            .await
            .map_err(|e| PipelineError::ExtractionFailed {
                reason: extraction_reason(e),
            })?;

        Ok(audio)
    }
}

/// Argument vector for the transcode: overwrite, drop video, 16-bit LE PCM,
/// 16kHz, mono.
pub fn extraction_args(video_path: &Path, audio_path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(11);
    args.push("-y".into());
    args.push("-i".into());
    args.push(video_path.into());
    args.push("-vn".into());
    args.push("-acodec".into());
    args.push(AUDIO_CODEC.into());
    args.push("-ar".into());
    args.push(SAMPLE_RATE.to_string().into());
    args.push("-ac".into());
    args.push(CHANNELS.to_string().into());
    args.push(audio_path.into());
    args
}

fn extraction_reason(error: RunnerError) -> String {
    match error {
        RunnerError::ExecutionFailed { status, stderr, .. } if stderr.is_empty() => {
            format!("transcoder exited with {}", status)
        }
        RunnerError::ExecutionFailed { stderr, .. } => stderr,
        other => other.to_string(),
    }
}
