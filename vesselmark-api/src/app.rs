/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use vesselmark_api::{app::{build_router, AppState}, config::Config};
/// use vesselmark_shared::{db::pool::{create_pool, DatabaseConfig}, storage::build_blob_store};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let blobs = build_blob_store(config.storage.backend, config.storage.root.clone());
///
/// let app = build_router(AppState::new(pool, config, blobs));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use vesselmark_shared::{
    auth::{jwt::TokenValidator, middleware::jwt_auth},
    services::{AnnotationService, DatasetService, ImageService, UserService},
    storage::BlobStore,
};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Raw image bytes
    pub blobs: Arc<dyn BlobStore>,

    /// Bearer token validator
    pub tokens: Arc<TokenValidator>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config, blobs: Arc<dyn BlobStore>) -> Self {
        let tokens = TokenValidator::new(
            &config.auth.jwt_secret,
            config.auth.issuer.clone(),
            config.auth.audience.clone(),
        );

        Self {
            db,
            config: Arc::new(config),
            blobs,
            tokens: Arc::new(tokens),
        }
    }

    pub fn datasets(&self) -> DatasetService {
        DatasetService::new(self.db.clone())
    }

    pub fn images(&self) -> ImageService {
        ImageService::new(self.db.clone(), self.blobs.clone())
            .with_read_timeout(self.config.storage.read_timeout())
    }

    pub fn annotations(&self) -> AnnotationService {
        AnnotationService::new(self.db.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.clone())
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                         # Health check (public)
/// ├── /users/                             # (authenticated)
/// │   ├── GET  /me
/// │   └── POST /register
/// ├── /datasets/                          # (authenticated)
/// │   ├── GET    /overview
/// │   ├── GET    /get/:id
/// │   ├── POST   /create
/// │   ├── DELETE /delete/:id
/// │   ├── PUT    /set-images/:id
/// │   └── PUT    /add-images/:id
/// ├── /images/                            # (authenticated)
/// │   ├── POST   /upload                  # multipart
/// │   ├── GET    /get/:id                 # raw bytes
/// │   ├── GET    /info/:id
/// │   ├── GET    /overview
/// │   ├── GET    /filter?category=
/// │   └── DELETE /delete/:id
/// └── /annotations/                       # (authenticated)
///     ├── POST /save
///     ├── GET  /get/:id
///     └── GET  /by-image?image_path=
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Compression (images are skipped)
/// 4. Logging (tower-http TraceLayer)
/// 5. Body size limit
/// 6. Authentication (every route except `/health`)
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let user_routes = Router::new()
        .route("/me", get(routes::users::me))
        .route("/register", post(routes::users::register));

    let dataset_routes = Router::new()
        .route("/overview", get(routes::datasets::overview))
        .route("/get/:id", get(routes::datasets::get_dataset))
        .route("/create", post(routes::datasets::create_dataset))
        .route("/delete/:id", delete(routes::datasets::delete_dataset))
        .route("/set-images/:id", put(routes::datasets::set_images))
        .route("/add-images/:id", put(routes::datasets::add_images));

    let image_routes = Router::new()
        .route("/upload", post(routes::images::upload))
        .route("/get/:id", get(routes::images::get_content))
        .route("/info/:id", get(routes::images::get_info))
        .route("/overview", get(routes::images::overview))
        .route("/filter", get(routes::images::filter))
        .route("/delete/:id", delete(routes::images::delete_image));

    let annotation_routes = Router::new()
        .route("/save", post(routes::annotations::save))
        .route("/get/:id", get(routes::annotations::get_annotation))
        .route("/by-image", get(routes::annotations::by_image));

    // Everything below requires a valid bearer token
    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/datasets", dataset_routes)
        .nest("/images", image_routes)
        .nest("/annotations", annotation_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.tokens.clone(),
            jwt_auth,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(health_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.api.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy from `api.cors_origins`
fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config.api.cors_origin_list();

    if origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
