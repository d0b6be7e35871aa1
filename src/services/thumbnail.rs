use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

use crate::api::error::AppError;
use crate::config::{AppConfig, ThumbnailStorage};
use crate::entities::videos;
use crate::models::VideoResponse;
use crate::services::video_service::VideoService;

/// Image types accepted as thumbnails, with the extension used on disk.
fn thumbnail_extension(declared: Option<&str>) -> Result<(&'static str, &'static str), AppError> {
    let declared = declared.ok_or_else(|| {
        AppError::UnsupportedMediaType("Thumbnail is missing a content type".to_string())
    })?;
    let parsed: mime::Mime = declared
        .parse()
        .map_err(|_| AppError::UnsupportedMediaType(format!("Invalid content type: {}", declared)))?;

    if parsed.essence_str() == mime::IMAGE_JPEG.essence_str() {
        Ok(("image/jpeg", "jpg"))
    } else if parsed.essence_str() == mime::IMAGE_PNG.essence_str() {
        Ok(("image/png", "png"))
    } else {
        Err(AppError::UnsupportedMediaType(format!(
            "Unsupported thumbnail type: {}, expected image/jpeg or image/png",
            parsed.essence_str()
        )))
    }
}

fn random_asset_name(extension: &str) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.r#gen()).collect();
    format!("{}.{}", URL_SAFE_NO_PAD.encode(&bytes), extension)
}

pub fn data_url(content_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(data))
}

pub struct ThumbnailService {
    videos: Arc<VideoService>,
    storage: ThumbnailStorage,
    assets_root: PathBuf,
    public_base_url: String,
    max_size: u64,
}

impl ThumbnailService {
    pub fn new(config: &AppConfig, videos: Arc<VideoService>) -> Self {
        Self {
            videos,
            storage: config.thumbnail_storage,
            assets_root: config.assets_root.clone(),
            public_base_url: config.public_base_url.clone(),
            max_size: config.max_thumbnail_size as u64,
        }
    }

    /// Stores a thumbnail for a record the caller already owns and returns
    /// the updated record.
    #[tracing::instrument(skip(self, video, reader), fields(video_id = %video.id))]
    pub async fn attach<R>(
        &self,
        mut video: videos::Model,
        content_type: Option<&str>,
        reader: R,
    ) -> Result<VideoResponse, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (content_type, extension) = thumbnail_extension(content_type)?;
        let data = self.read_capped(reader).await?;

        let (thumbnail_url, asset) = match self.storage {
            ThumbnailStorage::Inline => (data_url(content_type, &data), None),
            ThumbnailStorage::Filesystem => {
                let (url, path) = self.write_asset(extension, &data).await?;
                (url, Some(path))
            }
        };
        tracing::info!(
            "🖼️  Stored {} byte thumbnail for video {} ({:?})",
            data.len(),
            video.id,
            self.storage
        );

        video.thumbnail_url = Some(thumbnail_url);
        let saved = match self.videos.save(video).await {
            Ok(saved) => saved,
            Err(e) => {
                if let Some(path) = asset {
                    discard_asset(&path).await;
                }
                return Err(e);
            }
        };
        self.videos.signed(saved).await
    }

    async fn read_capped<R>(&self, reader: R) -> Result<Vec<u8>, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut data = Vec::new();
        let mut limited = reader.take(self.max_size + 1);
        match limited.read_to_end(&mut data).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::FileTooLarge => return Err(self.too_large()),
            Err(e) => return Err(AppError::StagingIo(e)),
        }
        if data.len() as u64 > self.max_size {
            return Err(self.too_large());
        }
        Ok(data)
    }

    /// Writes the asset and returns its public URL and path on disk.
    async fn write_asset(
        &self,
        extension: &str,
        data: &[u8],
    ) -> Result<(String, PathBuf), AppError> {
        let name = random_asset_name(extension);
        let path = self.assets_root.join(&name);

        tokio::fs::create_dir_all(&self.assets_root)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create asset root: {}", e)))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write {:?}: {}", path, e)))?;

        match asset_url(&self.public_base_url, &name) {
            Ok(url) => Ok((url, path)),
            Err(e) => {
                discard_asset(&path).await;
                Err(e)
            }
        }
    }

    fn too_large(&self) -> AppError {
        AppError::PayloadTooLarge(format!(
            "Thumbnail exceeds the maximum size of {} bytes",
            self.max_size
        ))
    }
}

async fn discard_asset(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::warn!("🗑️  Removed orphaned asset {:?}", path),
        Err(e) => tracing::error!("Failed to remove orphaned asset {:?}: {}", path, e),
    }
}

/// Public URL under which `/assets` serves `name`.
pub fn asset_url(base: &str, name: &str) -> Result<String, AppError> {
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let url = Url::parse(&base)
        .and_then(|b| b.join(&format!("assets/{}", name)))
        .map_err(|e| AppError::Internal(format!("Invalid public base URL {}: {}", base, e)))?;
    Ok(url.to_string())
}
