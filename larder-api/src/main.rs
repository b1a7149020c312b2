//! # Larder API Server
//!
//! Serves the Larder HTTP API: recipes, meal plans, grocery lists, sharing,
//! and public grocery list links.
//!
//! ## Start-up
//!
//! 1. Load configuration from the environment (`.env` honoured)
//! 2. Connect to PostgreSQL and apply pending migrations
//! 3. Serve until SIGINT/SIGTERM, then drain in-flight requests
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/larder JWT_SECRET=... cargo run -p larder-api
//! ```

use anyhow::Context;
use larder_api::{
    app::{build_router, AppState},
    config::Config,
};
use larder_shared::db::{
    migrations::run_migrations,
    pool::{self as db_pool, PoolConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder_api=debug,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber reads RUST_LOG / LOG_FORMAT
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Larder API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = db_pool::connect(&PoolConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db_pool::close(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
