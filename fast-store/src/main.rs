//! fast-store binary entry point.
//!
//! Usage:
//! ```bash
//! fast-store --config fast-store.toml
//! fast-store --help
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use fast_store::config::Config;
use fast_store::http::{build_router, init_start_time};
use fast_store::progress::spawn_progress_task;
use fast_store::server::FastStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Authoritative store for Unplugged fasting sessions.
#[derive(Parser, Debug)]
#[command(name = "fast-store", version, about)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fast_store=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    init_start_time();

    tracing::info!("Starting fast-store v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => Config::from_file(path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    tracing::info!(database = %config.storage.database.display(), "Configuration loaded");

    let store = Arc::new(
        FastStore::open(config.clone())
            .await
            .context("Failed to open store")?,
    );
    tracing::info!("Database ready");

    let progress = spawn_progress_task(store.clone(), config.progress.clone());

    let app = build_router(store);
    let listener = tokio::net::TcpListener::bind(&config.http.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http.bind_address))?;
    tracing::info!("Listening on {}", config.http.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    progress.abort();
    tracing::info!("fast-store stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
