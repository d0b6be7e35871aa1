use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Where uploaded thumbnails end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStorage {
    /// Written under `assets_root` and served from `/assets`.
    Filesystem,
    /// Embedded in the video record as a base64 `data:` URL.
    Inline,
}

impl ThumbnailStorage {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "filesystem" | "fs" | "local" => Some(Self::Filesystem),
            "inline" | "data-url" | "database" => Some(Self::Inline),
            _ => None,
        }
    }
}

/// Application configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port (default: 8091)
    pub port: u16,

    /// JWT signing secret (Required in production)
    pub jwt_secret: String,

    /// Maximum video upload size in bytes (default: 1 GiB)
    pub max_video_size: usize,

    /// Maximum thumbnail upload size in bytes (default: 10 MiB)
    pub max_thumbnail_size: usize,

    /// Bucket receiving processed videos
    pub s3_bucket: String,

    /// Bucket region (default: "us-east-1")
    pub s3_region: String,

    /// Custom S3 endpoint, e.g. MinIO. `None` means AWS.
    pub s3_endpoint: Option<String>,

    /// Static access key; falls back to the default AWS credential chain when unset
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// Lifetime of signed video URLs (default: 15 minutes)
    pub presign_ttl: Duration,

    /// Directory holding filesystem thumbnails (default: "./assets")
    pub assets_root: PathBuf,

    /// Public origin used to build asset URLs (default: "http://localhost:8091")
    pub public_base_url: String,

    /// Thumbnail backend (default: filesystem)
    pub thumbnail_storage: ThumbnailStorage,

    /// Directory for in-flight uploads (default: system temp dir)
    pub staging_dir: PathBuf,

    /// ffprobe executable (default: "ffprobe")
    pub ffprobe_path: String,

    /// ffmpeg executable (default: "ffmpeg")
    pub ffmpeg_path: String,

    /// Upper bound for a single probe or remux run (default: 300s)
    pub media_tool_timeout: Duration,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8091,
            jwt_secret: "secret".to_string(),
            max_video_size: 1024 * 1024 * 1024, // 1 GiB
            max_thumbnail_size: 10 * 1024 * 1024, // 10 MiB
            s3_bucket: "tubely".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            presign_ttl: Duration::from_secs(15 * 60),
            assets_root: PathBuf::from("./assets"),
            public_base_url: "http://localhost:8091".to_string(),
            thumbnail_storage: ThumbnailStorage::Filesystem,
            staging_dir: env::temp_dir(),
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            media_tool_timeout: Duration::from_secs(300),
            allowed_origins: vec!["http://localhost:8091".to_string()],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            max_video_size: env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),

            max_thumbnail_size: env::var("MAX_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_thumbnail_size),

            s3_bucket: env::var("S3_BUCKET").unwrap_or(default.s3_bucket),

            s3_region: env::var("S3_REGION").unwrap_or(default.s3_region),

            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            s3_access_key: env::var("S3_ACCESS_KEY").ok(),

            s3_secret_key: env::var("S3_SECRET_KEY").ok(),

            presign_ttl: env::var("PRESIGN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.presign_ttl),

            assets_root: env::var("ASSETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.assets_root),

            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(default.public_base_url),

            thumbnail_storage: env::var("THUMBNAIL_STORAGE")
                .ok()
                .and_then(|v| ThumbnailStorage::parse(&v))
                .unwrap_or(default.thumbnail_storage),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(default.ffprobe_path),

            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(default.ffmpeg_path),

            media_tool_timeout: env::var("MEDIA_TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.media_tool_timeout),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (inline thumbnails, local MinIO)
    pub fn development() -> Self {
        Self {
            s3_endpoint: Some("http://127.0.0.1:9000".to_string()),
            s3_access_key: Some("minioadmin".to_string()),
            s3_secret_key: Some("minioadmin".to_string()),
            thumbnail_storage: ThumbnailStorage::Inline,
            allowed_origins: vec![
                "http://localhost:8091".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:8091".to_string(),
            ],
            ..Self::default()
        }
    }

    /// Create config for production (secret must come from the environment)
    pub fn production() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .context("CRITICAL: JWT_SECRET must be set")?;
        Ok(Self {
            jwt_secret,
            ..Self::from_env()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_video_size, 1024 * 1024 * 1024);
        assert_eq!(config.max_thumbnail_size, 10 * 1024 * 1024);
        assert_eq!(config.presign_ttl, Duration::from_secs(900));
        assert_eq!(config.thumbnail_storage, ThumbnailStorage::Filesystem);
        assert_eq!(config.ffprobe_path, "ffprobe");
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.thumbnail_storage, ThumbnailStorage::Inline);
        assert_eq!(config.s3_endpoint.as_deref(), Some("http://127.0.0.1:9000"));
    }

    #[test]
    fn test_production_config() {
        unsafe { env::set_var("JWT_SECRET", "test_secret") };
        let config = AppConfig::production();
        unsafe { env::remove_var("JWT_SECRET") };
        assert_eq!(config.unwrap().jwt_secret, "test_secret");

        // Without a secret startup fails instead of panicking
        assert!(AppConfig::production().is_err());
    }

    #[test]
    fn test_thumbnail_storage_parse() {
        assert_eq!(
            ThumbnailStorage::parse("Filesystem"),
            Some(ThumbnailStorage::Filesystem)
        );
        assert_eq!(
            ThumbnailStorage::parse(" inline "),
            Some(ThumbnailStorage::Inline)
        );
        assert_eq!(ThumbnailStorage::parse("s3"), None);
    }
}
