//! # TaskDock API Server
//!
//! Task-management REST backend with optional dual-write mirroring between
//! PostgreSQL and MongoDB.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p taskdock-api
//! ```

use taskdock_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskdock_shared::store::connect::open_stores;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskdock_api=debug,taskdock_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskDock API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    tracing::info!(
        production = config.api.production,
        primary = config.storage.primary.backend(),
        secondary = config.storage.secondary.as_ref().map(|s| s.backend()),
        dual_write = config.storage.dual_write,
        "configuration loaded"
    );

    let stores = open_stores(
        &config.storage.primary,
        config.storage.secondary.as_ref(),
        config.storage.dual_write,
        config.startup_policy(),
    )
    .await?;

    let address = config.bind_address();
    let app = build_router(AppState::new(stores, config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
