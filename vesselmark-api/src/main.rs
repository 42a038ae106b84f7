//! # VesselMark API Server
//!
//! HTTP backend for uploading medical images, grouping them into datasets
//! and storing vessel-tree annotations drawn on them.
//!
//! ## Startup
//!
//! 1. Load configuration (`.env`, `vesselmark.toml`, `VESSELMARK_*`)
//! 2. Initialize tracing
//! 3. Open the SQLite pool and apply migrations
//! 4. Build the blob store and router
//! 5. Serve until Ctrl+C / SIGTERM
//!
//! ## Usage
//!
//! ```bash
//! VESSELMARK_AUTH__JWT_SECRET=... VESSELMARK_AUTH__ISSUER=... cargo run -p vesselmark-api
//! ```

use tokio_util::sync::CancellationToken;
use vesselmark_api::{
    app::{build_router, AppState},
    config::Config,
    telemetry::init_tracing,
};
use vesselmark_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    storage::build_blob_store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config.logging)?;

    tracing::info!(
        "VesselMark API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let blobs = build_blob_store(config.storage.backend, config.storage.root.clone());
    tracing::info!(backend = blobs.name(), root = %config.storage.root.display(), "Blob store ready");

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, blobs));

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Cancels `shutdown` on Ctrl+C or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
    shutdown.cancel();
}
