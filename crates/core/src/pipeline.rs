use std::{path::PathBuf, sync::Arc, time::Duration, time::Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::{
    artifacts::{ArtifactKind, TempArtifacts, extension_from_filename},
    error::{PipelineError, Result},
    extract::AudioExtractor,
    runner::{
        BinaryRunner, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_PROBE_TIMEOUT, RunOptions, RunnerError,
    },
    summarize::{Summarizer, summarize},
    transcribe::Transcriber,
    types::{PipelineOutcome, VideoUpload},
};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory that receives request-scoped temp files.
    pub temp_dir: PathBuf,
    /// Explicit transcoder path; wins over bundled and PATH lookup.
    pub ffmpeg_path: Option<PathBuf>,
    pub probe_timeout: Duration,
    /// No deadline on the transcode unless set.
    pub transcode_timeout: Option<Duration>,
    pub max_output_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            ffmpeg_path: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            transcode_timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Video in, `{transcription, summary}` out.
///
/// Stages run strictly in order: save video, extract audio, transcribe,
/// summarize. Everything before a transcript exists is fatal; a failed summary
/// only degrades the result. Temp files are released on every path.
pub struct Pipeline {
    artifacts: TempArtifacts,
    extractor: AudioExtractor,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let runner =
            BinaryRunner::resolve(config.ffmpeg_path).with_probe_timeout(config.probe_timeout);
        let options = RunOptions {
            timeout: config.transcode_timeout,
            max_output_bytes: config.max_output_bytes,
        };

        Self {
            artifacts: TempArtifacts::new(config.temp_dir),
            extractor: AudioExtractor::new(runner, options),
            transcriber,
            summarizer,
        }
    }

    pub fn runner(&self) -> &BinaryRunner {
        self.extractor.runner()
    }

    pub fn artifacts(&self) -> &TempArtifacts {
        &self.artifacts
    }

    pub async fn process(&self, upload: VideoUpload) -> Result<PipelineOutcome> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline",
            %request_id,
            file_name = %upload.file_name,
            bytes = upload.bytes.len()
        );

        async move {
            let started = Instant::now();
            let result = self.run_stages(upload).await;
            match &result {
                Ok(outcome) => tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    summary_degraded = outcome.summary.is_degraded(),
                    "Pipeline finished"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Pipeline failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, upload: VideoUpload) -> Result<PipelineOutcome> {
        let version = self
            .runner()
            .check_available()
            .await
            .map_err(|e| PipelineError::Unavailable {
                reason: match e {
                    RunnerError::Unavailable { reason, .. } => reason,
                    other => other.to_string(),
                },
            })?;
        tracing::debug!(%version, "Transcoder available");

        let video = self.artifacts.allocate(
            ArtifactKind::Video,
            extension_from_filename(&upload.file_name),
        );
        tokio::fs::write(video.path(), &upload.bytes)
            .await
            .map_err(|source| PipelineError::VideoSaveFailed {
                path: video.path().to_path_buf(),
                source,
            })?;
        drop(upload);
        tracing::debug!(path = %video.path().display(), "Video saved");

        let extracted = self.extractor.extract(&video, &self.artifacts).await;
        video.release();
        let audio = extracted?;
        tracing::debug!(path = %audio.path().display(), "Audio extracted");

        let audio_bytes = tokio::fs::read(audio.path()).await.map_err(|source| {
            PipelineError::ArtifactReadFailed {
                path: audio.path().to_path_buf(),
                source,
            }
        })?;

        let transcribed = self.transcriber.transcribe(&audio_bytes).await;
        audio.release();
        let transcription = transcribed?;
        tracing::debug!(chars = transcription.len(), "Transcribed");

        let summary = summarize(self.summarizer.as_ref(), &transcription).await;

        Ok(PipelineOutcome {
            transcription,
            summary,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        os::unix::fs::PermissionsExt,
        path::Path,
        sync::OnceLock,
    };

    use tempfile::TempDir;

    use super::*;
    use crate::{
        summarize::{MockSummarizer, SummarizationError},
        transcribe::{MockTranscriber, TranscriptionError},
    };

    /// Copies its input to its output, like a transcode that keeps the bytes.
    const COPYING_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 7.0-fake"
  exit 0
fi
while [ "$#" -gt 0 ]; do
  case "$1" in
    -i) input="$2"; shift ;;
  esac
  output="$1"
  shift
done
cp "$input" "$output"
"#;

    /// Writes half an output file, then fails.
    const FAILING_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 7.0-fake"
  exit 0
fi
for last; do :; done
printf 'RIFF' > "$last"
echo "Invalid data found when processing input" >&2
exit 1
"#;

    /// Claims success without producing anything.
    const SILENT_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 7.0-fake"
fi
exit 0
"#;

    fn scripts_dir() -> &'static Path {
        static DIR: OnceLock<TempDir> = OnceLock::new();
        DIR.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            for (name, body) in [
                ("copying-ffmpeg", COPYING_FFMPEG),
                ("failing-ffmpeg", FAILING_FFMPEG),
                ("silent-ffmpeg", SILENT_FFMPEG),
            ] {
                let path = dir.path().join(name);
                std::fs::write(&path, body).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
            dir
        })
        .path()
    }

    fn pipeline(
        temp_dir: &Path,
        ffmpeg: PathBuf,
        transcriber: MockTranscriber,
        summarizer: MockSummarizer,
    ) -> Pipeline {
        let config = PipelineConfig {
            temp_dir: temp_dir.to_path_buf(),
            ffmpeg_path: Some(ffmpeg),
            ..PipelineConfig::default()
        };
        Pipeline::new(config, Arc::new(transcriber), Arc::new(summarizer))
    }

    fn artifact_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn given_healthy_services_when_processing_then_returns_both_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .withf(|audio| audio == b"fake video bytes")
            .returning(|_| Ok("hello world".to_string()));
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .times(1)
            .withf(|transcript| transcript == "hello world")
            .returning(|_| Ok("A greeting.".to_string()));
        let pipeline = pipeline(
            temp.path(),
            scripts_dir().join("copying-ffmpeg"),
            transcriber,
            summarizer,
        );

        let outcome = pipeline
            .process(VideoUpload::new("talk.mp4", b"fake video bytes".to_vec()))
            .await
            .unwrap();

        assert_eq!(outcome.transcription, "hello world");
        assert_eq!(outcome.summary.as_str(), "A greeting.");
        assert_eq!(artifact_count(temp.path()), 0);
    }

    #[tokio::test]
    async fn given_missing_transcoder_when_processing_then_fails_before_any_remote_call() {
        let temp = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);
        let pipeline = pipeline(
            temp.path(),
            PathBuf::from("/nonexistent/ffmpeg"),
            transcriber,
            summarizer,
        );

        let result = pipeline
            .process(VideoUpload::new("talk.mp4", b"bytes".to_vec()))
            .await;

        match result {
            Err(e @ PipelineError::Unavailable { .. }) => {
                let message = e.to_string();
                assert!(message.starts_with("Transcoding binary unavailable: failed to start"));
                assert_eq!(message.matches("unavailable").count(), 1);
            }
            other => panic!("expected unavailable transcoder, got {:?}", other),
        }
        assert_eq!(artifact_count(temp.path()), 0);
    }

    #[tokio::test]
    async fn given_unwritable_temp_dir_when_processing_then_fails_before_any_remote_call() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing");
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);
        let pipeline = pipeline(
            &missing,
            scripts_dir().join("copying-ffmpeg"),
            transcriber,
            summarizer,
        );

        let result = pipeline
            .process(VideoUpload::new("talk.mp4", b"bytes".to_vec()))
            .await;

        match result {
            Err(PipelineError::VideoSaveFailed { path, source }) => {
                assert_eq!(path.parent(), Some(missing.as_path()));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected video save failure, got {:?}", other),
        }
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn given_failing_transcode_when_processing_then_reports_stderr_and_removes_files() {
        let temp = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);
        let pipeline = pipeline(
            temp.path(),
            scripts_dir().join("failing-ffmpeg"),
            transcriber,
            summarizer,
        );

        let result = pipeline
            .process(VideoUpload::new("talk.mp4", b"not a video".to_vec()))
            .await;

        match result {
            Err(PipelineError::ExtractionFailed { reason }) => {
                assert!(reason.contains("Invalid data found when processing input"));
            }
            other => panic!("expected extraction failure, got {:?}", other),
        }
        assert_eq!(artifact_count(temp.path()), 0);
    }

    #[tokio::test]
    async fn given_transcoder_without_output_when_processing_then_reports_unreadable_artifact() {
        let temp = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);
        let pipeline = pipeline(
            temp.path(),
            scripts_dir().join("silent-ffmpeg"),
            transcriber,
            summarizer,
        );

        let result = pipeline
            .process(VideoUpload::new("talk.mp4", b"bytes".to_vec()))
            .await;

        assert!(matches!(result, Err(PipelineError::ArtifactReadFailed { .. })));
        assert_eq!(artifact_count(temp.path()), 0);
    }

    #[tokio::test]
    async fn given_asr_failure_when_processing_then_summarizer_is_never_called() {
        let temp = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(1).returning(|_| {
            Err(TranscriptionError::Service {
                status: 401,
                body: "invalid credentials".to_string(),
            })
        });
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);
        let pipeline = pipeline(
            temp.path(),
            scripts_dir().join("copying-ffmpeg"),
            transcriber,
            summarizer,
        );

        let result = pipeline
            .process(VideoUpload::new("talk.mp4", b"bytes".to_vec()))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::TranscriptionFailed(_)));
        assert!(err.to_string().contains("invalid credentials"));
        assert_eq!(artifact_count(temp.path()), 0);
    }

    #[tokio::test]
    async fn given_summary_failure_when_processing_then_succeeds_with_diagnostic_summary() {
        let temp = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Ok("the real transcript".to_string()));
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(1).returning(|_| {
            Err(SummarizationError::InvalidResponse("empty choices".to_string()))
        });
        let pipeline = pipeline(
            temp.path(),
            scripts_dir().join("copying-ffmpeg"),
            transcriber,
            summarizer,
        );

        let outcome = pipeline
            .process(VideoUpload::new("talk.mp4", b"bytes".to_vec()))
            .await
            .unwrap();

        assert_eq!(outcome.transcription, "the real transcript");
        assert!(outcome.summary.is_degraded());
        assert!(outcome.summary.as_str().starts_with("Error generating summary: "));
        assert_eq!(artifact_count(temp.path()), 0);
    }

    #[tokio::test]
    async fn given_mixed_sequential_requests_when_processing_then_no_artifacts_leak() {
        let temp = tempfile::tempdir().unwrap();
        let before = artifact_count(temp.path());
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().returning(|audio| {
            if audio.starts_with(b"bad") {
                Err(TranscriptionError::InvalidResponse("garbage".to_string()))
            } else {
                Ok(String::from_utf8_lossy(audio).into_owned())
            }
        });
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|transcript| Ok(format!("summary of {}", transcript)));
        let pipeline = pipeline(
            temp.path(),
            scripts_dir().join("copying-ffmpeg"),
            transcriber,
            summarizer,
        );

        for i in 0..6 {
            let bytes = if i % 2 == 0 {
                format!("good-{}", i)
            } else {
                format!("bad-{}", i)
            };
            let _ = pipeline
                .process(VideoUpload::new("clip.webm", bytes.into_bytes()))
                .await;
        }

        assert_eq!(artifact_count(temp.path()), before);
    }
}
