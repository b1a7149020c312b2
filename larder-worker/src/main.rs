//! # Larder Worker
//!
//! Runs the maintenance sweeper until SIGINT/SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/larder cargo run -p larder-worker
//! ```

use anyhow::Context;
use larder_shared::db::{
    migrations::run_migrations,
    pool::{self as db_pool, PoolConfig},
};
use larder_worker::{config::WorkerConfig, sweeper::Sweeper};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder_worker=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Larder Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;

    let pool = db_pool::connect(&PoolConfig::new(
        config.database_url.clone(),
        config.max_connections,
    ))
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let sweeper = Sweeper::new(pool.clone(), config.sweep);
    let shutdown = sweeper.shutdown_token();

    let handle = tokio::spawn(async move { sweeper.run().await });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping sweeper...");
    shutdown.cancel();

    handle.await.context("Sweeper task panicked")?;

    db_pool::close(pool).await;
    tracing::info!("Worker stopped");

    Ok(())
}
