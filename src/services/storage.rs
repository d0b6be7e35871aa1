use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use std::time::Duration;

use crate::models::ObjectLocation;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Streams the file at `path` to `key`, overwriting any existing object.
    async fn upload_path(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<ObjectLocation>;

    async fn delete_file(&self, key: &str) -> Result<()>;

    /// Signs a GET for `location`. Local computation only, no request is sent.
    async fn presigned_get_url(
        &self,
        location: &ObjectLocation,
        expires_in: Duration,
    ) -> Result<String>;

    async fn health_check(&self) -> bool;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_path(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<ObjectLocation> {
        let body = ByteStream::from_path(path).await?;

        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={:?}",
                self.bucket,
                key,
                e
            );
            return Err(e.into());
        }

        Ok(ObjectLocation::new(self.bucket.clone(), key))
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        location: &ObjectLocation,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)?;
        let request = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(presigning)
            .await?;
        Ok(request.uri().to_string())
    }

    async fn health_check(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }
}
