use axum::{
    Json,
    extract::{Multipart, State},
};
use recap_core::VideoUpload;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Multipart field carrying the upload.
pub const VIDEO_FIELD: &str = "video";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub msg: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub transcription: String,
    pub summary: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        msg: "recap is running",
    })
}

pub async fn process_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let upload = read_video_field(&mut multipart)
        .await?
        .ok_or(ApiError::MissingVideo)?;

    tracing::info!(
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "Received video upload"
    );

    let outcome = state.pipeline.process(upload).await?;

    Ok(Json(ProcessResponse {
        transcription: outcome.transcription,
        summary: outcome.summary.into_string(),
    }))
}

/// Buffer the `video` field in memory. Other fields are skipped; an empty file
/// counts as missing.
async fn read_video_field(multipart: &mut Multipart) -> Result<Option<VideoUpload>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}.mp4", Uuid::new_v4()));
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            return Ok(None);
        }

        return Ok(Some(VideoUpload::new(file_name, bytes.to_vec())));
    }

    Ok(None)
}
