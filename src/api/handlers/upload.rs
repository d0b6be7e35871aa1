use crate::api::error::AppError;
use crate::api::handlers::videos::parse_video_id;
use crate::models::VideoResponse;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::Field, multipart::MultipartError},
    http::StatusCode,
};
use futures::TryStreamExt;
use std::io;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

pub const VIDEO_FIELD: &str = "video";
pub const THUMBNAIL_FIELD: &str = "thumbnail";

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn missing_field(name: &str) -> AppError {
    AppError::BadRequest(format!("Missing file field '{}'", name))
}

/// Body reader for a field. Oversized bodies surface as `FileTooLarge`.
fn field_reader<'a>(field: Field<'a>) -> impl AsyncRead + Unpin + Send + 'a {
    StreamReader::new(field.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            io::Error::new(io::ErrorKind::FileTooLarge, e.body_text())
        } else {
            io::Error::other(e)
        }
    }))
}

#[utoipa::path(
    post,
    path = "/api/videos/{id}/upload",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = Multipart, description = "MP4 file in the `video` field"),
    responses(
        (status = 200, description = "Video processed and stored", body = VideoResponse),
        (status = 400, description = "Invalid video ID, missing file or unsupported type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the video"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Upload too large"),
        (status = 500, description = "Processing or storage failure")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn upload_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(&id)?;
    let video = state.videos.authorize_owner(&video_id, &claims.sub).await?;

    tracing::info!("📤 Uploading video {} for user {}", video_id, claims.sub);

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let response = state
            .ingest
            .ingest(video, content_type.as_deref(), field_reader(field))
            .await?;
        return Ok(Json(response));
    }

    Err(missing_field(VIDEO_FIELD))
}

#[utoipa::path(
    post,
    path = "/api/videos/{id}/thumbnail",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = Multipart, description = "JPEG or PNG image in the `thumbnail` field"),
    responses(
        (status = 200, description = "Thumbnail stored", body = VideoResponse),
        (status = 400, description = "Invalid video ID, missing file or unsupported type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the video"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Upload too large")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn upload_thumbnail(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(&id)?;
    let video = state.videos.authorize_owner(&video_id, &claims.sub).await?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let response = state
            .thumbnails
            .attach(video, content_type.as_deref(), field_reader(field))
            .await?;
        return Ok(Json(response));
    }

    Err(missing_field(THUMBNAIL_FIELD))
}
