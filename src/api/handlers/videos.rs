use crate::api::error::AppError;
use crate::models::VideoResponse;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
}

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid video ID".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video draft created", body = VideoResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn create_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let video = state
        .videos
        .create(&claims.sub, req.title.trim().to_string(), req.description)
        .await?;

    Ok((StatusCode::CREATED, Json(video)))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Videos owned by the caller", body = [VideoResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn list_videos(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    Ok(Json(state.videos.list_for_user(&claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video with a freshly signed URL", body = VideoResponse),
        (status = 400, description = "Invalid video ID"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<crate::AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(&id)?;
    let video = state.videos.get(&video_id).await?;
    Ok(Json(state.videos.signed(video).await?))
}
