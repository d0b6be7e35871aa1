use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::{prelude::*, videos};

/// Metadata store for video records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, id: &str) -> Result<Option<videos::Model>, DbErr>;
    /// Writes every column of `video`; last writer wins.
    async fn update_video(&self, video: videos::Model) -> Result<videos::Model, DbErr>;
    async fn create_video(&self, video: videos::Model) -> Result<videos::Model, DbErr>;
    async fn list_videos_for_user(&self, user_id: &str) -> Result<Vec<videos::Model>, DbErr>;
}

pub struct SeaOrmVideoStore {
    db: DatabaseConnection,
}

impl SeaOrmVideoStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for SeaOrmVideoStore {
    async fn get_video(&self, id: &str) -> Result<Option<videos::Model>, DbErr> {
        Videos::find_by_id(id).one(&self.db).await
    }

    async fn update_video(&self, video: videos::Model) -> Result<videos::Model, DbErr> {
        let active: videos::ActiveModel = video.into();
        active.reset_all().update(&self.db).await
    }

    async fn create_video(&self, video: videos::Model) -> Result<videos::Model, DbErr> {
        let active: videos::ActiveModel = video.into();
        active.reset_all().insert(&self.db).await
    }

    async fn list_videos_for_user(&self, user_id: &str) -> Result<Vec<videos::Model>, DbErr> {
        Videos::find()
            .filter(videos::Column::UserId.eq(user_id))
            .order_by_desc(videos::Column::CreatedAt)
            .all(&self.db)
            .await
    }
}
