pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod media;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::media::{FastStartRemuxer, GeometryProber};
use crate::services::ingest::VideoIngestService;
use crate::services::storage::StorageService;
use crate::services::thumbnail::ThumbnailService;
use crate::services::video_service::VideoService;
use crate::services::video_store::VideoStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Slack on top of the file cap for multipart framing.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::videos::create_video,
        api::handlers::videos::list_videos,
        api::handlers::videos::get_video,
        api::handlers::upload::upload_video,
        api::handlers::upload::upload_thumbnail,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::auth::RegisterRequest,
            api::handlers::auth::UserResponse,
            api::handlers::auth::LoginRequest,
            api::handlers::auth::LoginResponse,
            api::handlers::videos::CreateVideoRequest,
            models::VideoResponse,
        )
    ),
    tags(
        (name = "auth", description = "Account endpoints"),
        (name = "videos", description = "Video records and uploads"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub storage: Arc<dyn StorageService>,
    pub videos: Arc<VideoService>,
    pub ingest: Arc<VideoIngestService>,
    pub thumbnails: Arc<ThumbnailService>,
}

impl AppState {
    /// Wires the services around the given back ends.
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        storage: Arc<dyn StorageService>,
        store: Arc<dyn VideoStore>,
        prober: Arc<dyn GeometryProber>,
        remuxer: Arc<dyn FastStartRemuxer>,
    ) -> Self {
        let videos = Arc::new(VideoService::new(
            store,
            storage.clone(),
            config.presign_ttl,
        ));
        let ingest = Arc::new(VideoIngestService::new(
            &config,
            videos.clone(),
            storage.clone(),
            prober,
            remuxer,
        ));
        let thumbnails = Arc::new(ThumbnailService::new(&config, videos.clone()));

        Self {
            db,
            config,
            storage,
            videos,
            ingest,
            thumbnails,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let auth = || from_fn_with_state(state.clone(), api::middleware::auth::auth_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/users", post(api::handlers::auth::register))
        .route("/api/login", post(api::handlers::auth::login))
        .route(
            "/api/videos",
            get(api::handlers::videos::list_videos)
                .post(api::handlers::videos::create_video)
                .layer(auth()),
        )
        .route(
            "/api/videos/:id",
            get(api::handlers::videos::get_video).layer(auth()),
        )
        .route(
            "/api/videos/:id/upload",
            post(api::handlers::upload::upload_video)
                .layer(DefaultBodyLimit::max(
                    state.config.max_video_size + MULTIPART_OVERHEAD,
                ))
                .layer(auth()),
        )
        .route(
            "/api/videos/:id/thumbnail",
            post(api::handlers::upload::upload_thumbnail)
                .layer(DefaultBodyLimit::max(
                    state.config.max_thumbnail_size + MULTIPART_OVERHEAD,
                ))
                .layer(auth()),
        )
        .nest_service("/assets", ServeDir::new(&state.config.assets_root))
        .layer(cors_layer(&state.config))
        .with_state(state)
}
