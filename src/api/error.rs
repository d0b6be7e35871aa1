use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::media::{MediaError, MediaTool};
use crate::models::LocationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    #[error("Staging I/O failure: {0}")]
    StagingIo(#[from] std::io::Error),

    #[error("Probe failure: {0}")]
    ProbeFailure(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Remux failure: {0}")]
    RemuxFailure(String),

    #[error("Upload failure: {0}")]
    UploadFailure(String),

    #[error("Persist failure: {0}")]
    PersistFailure(String),

    #[error("Signing failure: {0}")]
    SigningFailure(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::DegenerateGeometry { .. } => AppError::DegenerateGeometry(err.to_string()),
            MediaError::Probe(_) => AppError::ProbeFailure(err.to_string()),
            MediaError::Remux(_) => AppError::RemuxFailure(err.to_string()),
            MediaError::Spawn { tool, .. } | MediaError::Timeout { tool, .. } => match tool {
                MediaTool::Ffprobe => AppError::ProbeFailure(err.to_string()),
                MediaTool::Ffmpeg => AppError::RemuxFailure(err.to_string()),
            },
        }
    }
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        AppError::SigningFailure(err.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) | AppError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_)
            | AppError::StagingIo(_)
            | AppError::ProbeFailure(_)
            | AppError::DegenerateGeometry(_)
            | AppError::RemuxFailure(_)
            | AppError::UploadFailure(_)
            | AppError::PersistFailure(_)
            | AppError::SigningFailure(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::UnsupportedMediaType(msg) => msg,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Internal Server Error".to_string()
            }
            AppError::StagingIo(e) => {
                tracing::error!("Staging I/O error: {:?}", e);
                "Failed to stage upload".to_string()
            }
            AppError::ProbeFailure(msg) | AppError::DegenerateGeometry(msg) => {
                tracing::error!("Probe error: {}", msg);
                "Failed to inspect video".to_string()
            }
            AppError::RemuxFailure(msg) => {
                tracing::error!("Remux error: {}", msg);
                "Failed to process video".to_string()
            }
            AppError::UploadFailure(msg) => {
                tracing::error!("Upload error: {}", msg);
                "Failed to store video".to_string()
            }
            AppError::PersistFailure(msg) => {
                tracing::error!("Persist error: {}", msg);
                "Failed to update video".to_string()
            }
            AppError::SigningFailure(msg) => {
                tracing::error!("Signing error: {}", msg);
                "Failed to sign video URL".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
