//! # Piquant API Server
//!
//! Binary entrypoint: loads configuration, connects and migrates the
//! database, prepares the image directory, and serves the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... JWT_SECRET=$(openssl rand -hex 32) \
//!     cargo run -p piquant-api
//! ```

use piquant_api::{
    app::{build_router, AppState},
    config::Config,
};
use piquant_shared::{
    db::{migrations::run_migrations, pool},
    storage::images::ImageStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "piquant_api=debug,piquant_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Piquant API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    // Database pool + schema
    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&db).await?;

    // Image directory must exist before anything references it
    let images = ImageStore::new(&config.storage.upload_dir);
    images.ensure_root().await?;

    let addr = config.bind_address();
    let state = AppState::new(db, images, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
