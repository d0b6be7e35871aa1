#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::{Database, DatabaseConnection, DbErr};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tubely::config::{AppConfig, ThumbnailStorage};
use tubely::entities::videos;
use tubely::infrastructure::database;
use tubely::media::{
    FastStartRemuxer, Geometry, GeometryProber, MediaError, remux_output_path,
};
use tubely::models::ObjectLocation;
use tubely::services::storage::StorageService;
use tubely::services::video_store::{SeaOrmVideoStore, VideoStore};
use tubely::{AppState, create_app};

pub const BUCKET: &str = "tubely-test";

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("tubely=debug,tower_http=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store. Presigned URLs embed the key and expiry so tests
/// can inspect them.
pub struct MockStorageService {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_uploads: AtomicBool,
    pub deleted: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_path(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> anyhow::Result<ObjectLocation> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated put_object failure"));
        }
        let data = tokio::fs::read(path).await?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(ObjectLocation::new(BUCKET, key))
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        location: &ObjectLocation,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        Ok(format!(
            "https://objects.test/{}/{}?X-Amz-Expires={}&X-Amz-Signature=mock",
            location.bucket,
            location.key,
            expires_in.as_secs()
        ))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Reports a fixed geometry and remembers which files it was asked about.
pub struct FakeProber {
    pub result: Mutex<Result<(u32, u32), String>>,
    pub probed: Mutex<Vec<PathBuf>>,
}

impl FakeProber {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            result: Mutex::new(Ok((width, height))),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Mutex::new(Err(reason.to_string())),
            probed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GeometryProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        assert!(path.exists(), "probed file {:?} must exist", path);
        let result = self.result.lock().unwrap().clone();
        match result {
            Ok((width, height)) => Geometry::new(width, height),
            Err(reason) => Err(MediaError::Probe(reason)),
        }
    }
}

/// Copies the input to the fast-start output path.
pub struct CopyRemuxer;

#[async_trait]
impl FastStartRemuxer for CopyRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, MediaError> {
        let output = remux_output_path(input);
        tokio::fs::copy(input, &output)
            .await
            .map_err(|e| MediaError::Remux(e.to_string()))?;
        Ok(output)
    }
}

/// Leaves a partial output file behind, then fails.
pub struct BrokenRemuxer;

#[async_trait]
impl FastStartRemuxer for BrokenRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, MediaError> {
        tokio::fs::write(remux_output_path(input), b"partial")
            .await
            .map_err(|e| MediaError::Remux(e.to_string()))?;
        Err(MediaError::Remux("moov atom not found".to_string()))
    }
}

/// Delegates to the real store but rejects every update.
pub struct ReadOnlyVideoStore {
    inner: SeaOrmVideoStore,
}

impl ReadOnlyVideoStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            inner: SeaOrmVideoStore::new(db),
        }
    }
}

#[async_trait]
impl VideoStore for ReadOnlyVideoStore {
    async fn get_video(&self, id: &str) -> Result<Option<videos::Model>, DbErr> {
        self.inner.get_video(id).await
    }

    async fn update_video(&self, _video: videos::Model) -> Result<videos::Model, DbErr> {
        Err(DbErr::Custom("database is read-only".to_string()))
    }

    async fn create_video(&self, video: videos::Model) -> Result<videos::Model, DbErr> {
        self.inner.create_video(video).await
    }

    async fn list_videos_for_user(&self, user_id: &str) -> Result<Vec<videos::Model>, DbErr> {
        self.inner.list_videos_for_user(user_id).await
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub db: DatabaseConnection,
    pub storage: Arc<MockStorageService>,
    pub prober: Arc<FakeProber>,
    pub staging: TempDir,
    pub assets: TempDir,
}

pub struct TestAppBuilder {
    prober: FakeProber,
    remuxer: Arc<dyn FastStartRemuxer>,
    read_only_store: bool,
    thumbnail_storage: ThumbnailStorage,
    max_video_size: usize,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            prober: FakeProber::new(1280, 720),
            remuxer: Arc::new(CopyRemuxer),
            read_only_store: false,
            thumbnail_storage: ThumbnailStorage::Filesystem,
            max_video_size: 1024 * 1024,
        }
    }

    pub fn geometry(mut self, width: u32, height: u32) -> Self {
        self.prober = FakeProber::new(width, height);
        self
    }

    pub fn prober(mut self, prober: FakeProber) -> Self {
        self.prober = prober;
        self
    }

    pub fn remuxer(mut self, remuxer: Arc<dyn FastStartRemuxer>) -> Self {
        self.remuxer = remuxer;
        self
    }

    pub fn read_only_store(mut self) -> Self {
        self.read_only_store = true;
        self
    }

    pub fn thumbnail_storage(mut self, storage: ThumbnailStorage) -> Self {
        self.thumbnail_storage = storage;
        self
    }

    pub fn max_video_size(mut self, bytes: usize) -> Self {
        self.max_video_size = bytes;
        self
    }

    pub async fn build(self) -> TestApp {
        init_tracing();

        let db = setup_test_db().await;
        let staging = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();

        let config = AppConfig {
            jwt_secret: "test_secret".to_string(),
            s3_bucket: BUCKET.to_string(),
            staging_dir: staging.path().to_path_buf(),
            assets_root: assets.path().to_path_buf(),
            public_base_url: "http://localhost:8091".to_string(),
            thumbnail_storage: self.thumbnail_storage,
            max_video_size: self.max_video_size,
            max_thumbnail_size: 64 * 1024,
            ..AppConfig::default()
        };

        let storage = Arc::new(MockStorageService::new());
        let prober = Arc::new(self.prober);
        let store: Arc<dyn VideoStore> = if self.read_only_store {
            Arc::new(ReadOnlyVideoStore::new(db.clone()))
        } else {
            Arc::new(SeaOrmVideoStore::new(db.clone()))
        };

        let state = AppState::new(
            db.clone(),
            config,
            storage.clone(),
            store,
            prober.clone(),
            self.remuxer,
        );
        let app = create_app(state.clone());

        TestApp {
            app,
            state,
            db,
            storage,
            prober,
            staging,
            assets,
        }
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

impl TestApp {
    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Registers and logs in, returning `(token, user_id)`.
    pub async fn signup(&self, email: &str) -> (String, String) {
        let response = self
            .post_json(
                "/api/users",
                None,
                json!({"email": email, "password": "password123"}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self
            .post_json(
                "/api/login",
                None,
                json!({"email": email, "password": "password123"}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        (
            json["token"].as_str().unwrap().to_string(),
            json["user_id"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a draft video and returns its id.
    pub async fn create_video(&self, token: &str, title: &str) -> String {
        let response = self
            .post_json(
                "/api/videos",
                Some(token),
                json!({"title": title, "description": "test upload"}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_str().unwrap().to_string()
    }

    pub async fn upload(
        &self,
        uri: &str,
        token: Option<&str>,
        field: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Response<Body> {
        let (boundary, body) = multipart_body(field, content_type, data);
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            );
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn stored_video(&self, id: &str) -> videos::Model {
        use sea_orm::EntityTrait;
        tubely::entities::prelude::Videos::find_by_id(id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
    }

    pub fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging.path()).unwrap().next().is_none()
    }
}

pub fn multipart_body(field: &str, content_type: Option<&str>, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "---------------------------123456789012345678901234567";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n",
            field
        )
        .as_bytes(),
    );
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (boundary.to_string(), body)
}
