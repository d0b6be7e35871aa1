use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::error::AppError;
use crate::entities::videos;
use crate::models::{ObjectLocation, VideoResponse};
use crate::services::storage::StorageService;
use crate::services::video_store::VideoStore;

/// Record-level operations shared by the handlers and both upload paths:
/// ownership checks, persistence and read-time URL signing.
pub struct VideoService {
    store: Arc<dyn VideoStore>,
    storage: Arc<dyn StorageService>,
    presign_ttl: Duration,
}

impl VideoService {
    pub fn new(
        store: Arc<dyn VideoStore>,
        storage: Arc<dyn StorageService>,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            presign_ttl,
        }
    }

    pub async fn create(
        &self,
        user_id: &str,
        title: String,
        description: String,
    ) -> Result<VideoResponse, AppError> {
        let now = Utc::now();
        let video = videos::Model {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            description,
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.create_video(video).await?;
        tracing::info!("🎬 Created video {} for user {}", created.id, user_id);
        Ok(VideoResponse::from_record(created, None))
    }

    pub async fn get(&self, video_id: &Uuid) -> Result<videos::Model, AppError> {
        self.store
            .get_video(&video_id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    /// Loads a record the caller is allowed to mutate. Must run before any
    /// storage side effect.
    pub async fn authorize_owner(
        &self,
        video_id: &Uuid,
        user_id: &str,
    ) -> Result<videos::Model, AppError> {
        let video = self.get(video_id).await?;
        if video.user_id != user_id {
            tracing::warn!(
                "🚫 User {} attempted to modify video {} owned by {}",
                user_id,
                video.id,
                video.user_id
            );
            return Err(AppError::Forbidden(
                "You do not own this video".to_string(),
            ));
        }
        Ok(video)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<VideoResponse>, AppError> {
        let records = self.store.list_videos_for_user(user_id).await?;
        let mut responses = Vec::with_capacity(records.len());
        for record in records {
            responses.push(self.signed(record).await?);
        }
        Ok(responses)
    }

    /// Persists `video` with a fresh `updated_at`.
    pub async fn save(&self, mut video: videos::Model) -> Result<videos::Model, AppError> {
        video.updated_at = Utc::now();
        self.store
            .update_video(video)
            .await
            .map_err(|e| AppError::PersistFailure(e.to_string()))
    }

    /// Expands the stored location reference into a signed URL. The record
    /// itself is left untouched.
    pub async fn signed(&self, video: videos::Model) -> Result<VideoResponse, AppError> {
        let signed_url = match video.video_url.as_deref() {
            None => None,
            Some(reference) => {
                let location: ObjectLocation = reference.parse()?;
                Some(self.sign_location(&location).await?)
            }
        };
        Ok(VideoResponse::from_record(video, signed_url))
    }

    pub async fn sign_location(&self, location: &ObjectLocation) -> Result<String, AppError> {
        self.storage
            .presigned_get_url(location, self.presign_ttl)
            .await
            .map_err(|e| AppError::SigningFailure(e.to_string()))
    }
}
