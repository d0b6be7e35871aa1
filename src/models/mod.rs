use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

use crate::entities::videos;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LocationError {
    #[error("location reference must have exactly two comma-separated parts, found {0}")]
    WrongArity(usize),
    #[error("location reference has an empty bucket or key")]
    EmptyPart,
}

/// Durable `{bucket, key}` pair identifying a stored object.
///
/// Stored in the metadata record as `"{bucket},{key}"`; the comma-joined form
/// only exists at that boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectLocation {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(LocationError::WrongArity(parts.len()));
        }
        let (bucket, key) = (parts[0], parts[1]);
        if bucket.is_empty() || key.is_empty() {
            return Err(LocationError::EmptyPart);
        }
        Ok(Self::new(bucket, key))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    /// Signed, short-lived URL; never the stored location reference
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoResponse {
    /// Builds a response from a record whose video URL has already been signed.
    pub fn from_record(video: videos::Model, signed_url: Option<String>) -> Self {
        Self {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            thumbnail_url: video.thumbnail_url,
            video_url: signed_url,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}
