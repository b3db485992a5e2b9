/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use piquant_api::{app::AppState, config::Config};
/// use piquant_shared::storage::images::ImageStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let images = ImageStore::new(&config.storage.upload_dir);
/// let state = AppState::new(pool, images, config);
/// let app = piquant_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use piquant_shared::{auth::middleware, storage::images::ImageStore};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted request body; image uploads need more than the default
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; cheap because the pool
/// and config are reference-counted internally.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Image file store
    pub images: ImageStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, images: ImageStore, config: Config) -> Self {
        Self {
            db,
            images,
            config: Arc::new(config),
        }
    }

    /// Gets the token signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                   # Health check (public)
/// ├── /images/:filename         # Stored image files (public, static)
/// └── /v1/                      # API v1 (versioned)
///     ├── /auth/                # Authentication (public)
///     │   ├── POST /signup
///     │   └── POST /login
///     └── /items/               # Items (bearer-authenticated)
///         ├── GET    /
///         ├── POST   /          # multipart: item JSON + image file
///         ├── GET    /:id
///         ├── PUT    /:id       # owner only
///         ├── DELETE /:id       # owner only
///         └── POST   /:id/vote
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Bearer authentication (item routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login));

    // Item routes (require bearer authentication)
    let item_routes = Router::new()
        .route(
            "/",
            get(routes::items::list_items).post(routes::items::create_item),
        )
        .route(
            "/:id",
            get(routes::items::get_item)
                .put(routes::items::update_item)
                .delete(routes::items::delete_item),
        )
        .route("/:id/vote", post(routes::items::vote_item))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/items", item_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
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
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .nest_service(
            "/images",
            ServeDir::new(state.config.storage.upload_dir.clone()),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Bearer authentication middleware layer
///
/// Delegates to the shared guard: verifies the token from the Authorization
/// header and injects [`piquant_shared::auth::middleware::AuthUser`] into
/// request extensions. Runs before any handler touches the database or the
/// image directory.
async fn bearer_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    middleware::bearer_auth(state.jwt_secret().to_string(), req, next)
        .await
        .map_err(crate::error::ApiError::from)
}
