use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::entities::videos;
use crate::media::{AspectClass, FastStartRemuxer, GeometryProber, remux_output_path};
use crate::models::{ObjectLocation, VideoResponse};
use crate::services::storage::StorageService;
use crate::services::video_service::VideoService;

const VIDEO_CONTENT_TYPE: &str = "video/mp4";
const STAGING_PREFIX: &str = "tubely-upload-";

/// Upload copied to local disk. The file is removed when this is dropped.
pub struct StagedUpload {
    path: TempPath,
    pub size: u64,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves the declared content type of an uploaded video. The remuxer
/// always writes an MP4 container, so MP4 is stored. A missing type and
/// `application/octet-stream` (what most multipart clients send for a file
/// they cannot classify) are taken as MP4 and left to the probe to verify.
pub fn video_content_type(declared: Option<&str>) -> Result<&'static str, AppError> {
    let Some(declared) = declared else {
        return Ok(VIDEO_CONTENT_TYPE);
    };

    let parsed: mime::Mime = declared
        .parse()
        .map_err(|_| AppError::UnsupportedMediaType(format!("Invalid content type: {}", declared)))?;

    let essence = parsed.essence_str();
    if essence != VIDEO_CONTENT_TYPE && essence != mime::APPLICATION_OCTET_STREAM.essence_str() {
        return Err(AppError::UnsupportedMediaType(format!(
            "Unsupported video type: {}, expected {}",
            essence,
            VIDEO_CONTENT_TYPE
        )));
    }

    Ok(VIDEO_CONTENT_TYPE)
}

/// Storage key for a remuxed file: `{classification}/{file name}`.
pub fn destination_key(class: AspectClass, remuxed: &Path) -> Result<String, AppError> {
    let file_name = remuxed
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Internal(format!("Unusable staging path {:?}", remuxed)))?;
    Ok(format!("{}/{}", class.prefix(), file_name))
}

/// Video upload pipeline: stage, remux, probe, classify, upload, persist, sign.
pub struct VideoIngestService {
    videos: Arc<VideoService>,
    storage: Arc<dyn StorageService>,
    prober: Arc<dyn GeometryProber>,
    remuxer: Arc<dyn FastStartRemuxer>,
    staging_dir: PathBuf,
    max_video_size: u64,
}

impl VideoIngestService {
    pub fn new(
        config: &AppConfig,
        videos: Arc<VideoService>,
        storage: Arc<dyn StorageService>,
        prober: Arc<dyn GeometryProber>,
        remuxer: Arc<dyn FastStartRemuxer>,
    ) -> Self {
        Self {
            videos,
            storage,
            prober,
            remuxer,
            staging_dir: config.staging_dir.clone(),
            max_video_size: config.max_video_size as u64,
        }
    }

    /// Copies `reader` into a fresh file under the staging directory,
    /// failing once more than `max_video_size` bytes arrive.
    #[tracing::instrument(skip(self, reader))]
    pub async fn stage<R>(&self, reader: R) -> Result<StagedUpload, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let named = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".mp4")
            .tempfile_in(&self.staging_dir)?;
        let (file, path) = named.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        // One byte past the cap is enough to detect an oversized body
        let mut limited = reader.take(self.max_video_size + 1);
        let size = match tokio::io::copy(&mut limited, &mut file).await {
            Ok(size) => size,
            Err(e) if e.kind() == ErrorKind::FileTooLarge => {
                return Err(self.too_large());
            }
            Err(e) => return Err(AppError::StagingIo(e)),
        };

        if size > self.max_video_size {
            return Err(self.too_large());
        }

        file.flush().await?;
        tracing::debug!("Staged {} bytes at {:?}", size, path);

        Ok(StagedUpload { path, size })
    }

    /// Runs the pipeline for a record the caller already owns.
    #[tracing::instrument(skip(self, video, reader), fields(video_id = %video.id))]
    pub async fn ingest<R>(
        &self,
        mut video: videos::Model,
        content_type: Option<&str>,
        reader: R,
    ) -> Result<VideoResponse, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let content_type = video_content_type(content_type)?;

        let staged = self.stage(reader).await?;
        tracing::info!("📥 Staged {} bytes for video {}", staged.size, video.id);

        // Guard the remux output before the tool runs so a partial file is
        // removed as well
        let remuxed = TempPath::from_path(remux_output_path(staged.path()));
        let output = self.remuxer.remux(staged.path()).await?;
        if output.as_path() != &*remuxed {
            return Err(AppError::RemuxFailure(format!(
                "remuxer wrote {:?}, expected {:?}",
                output, &*remuxed
            )));
        }

        let geometry = self.prober.probe(&remuxed).await?;
        let class = geometry.aspect_class();
        tracing::info!(
            "🎞️  Video {} is {}x{} ({})",
            video.id,
            geometry.width,
            geometry.height,
            class
        );

        let key = destination_key(class, &remuxed)?;
        let location = self
            .storage
            .upload_path(&key, &remuxed, content_type)
            .await
            .map_err(|e| AppError::UploadFailure(e.to_string()))?;
        tracing::info!("☁️  Uploaded video {} to {}", video.id, location);

        video.video_url = Some(location.to_string());
        let saved = match self.videos.save(video).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard(&location).await;
                return Err(e);
            }
        };

        self.videos.signed(saved).await
    }

    async fn discard(&self, location: &ObjectLocation) {
        match self.storage.delete_file(&location.key).await {
            Ok(()) => tracing::warn!("🗑️  Removed orphaned object {}", location),
            Err(e) => tracing::error!("Failed to remove orphaned object {}: {}", location, e),
        }
    }

    fn too_large(&self) -> AppError {
        AppError::PayloadTooLarge(format!(
            "Video exceeds the maximum size of {} bytes",
            self.max_video_size
        ))
    }
}
