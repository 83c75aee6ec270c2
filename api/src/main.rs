mod aggregate;
mod config;
mod db;
mod errors;
mod metrics;
mod model;
mod rest;
mod service;
mod store;

use anyhow::Context;
use axum::{routing::get, Router};
use config::Config;
use db::PgEventStore;
use service::EventQueryService;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    info!("Starting bowl events API");
    info!("HTTP server: {}", config.http_addr);
    info!("Device: {}, timezone: {}", config.device_id, config.timezone);
    info!("Database: {}", config.redacted_database_url());

    metrics::init_metrics().context("Failed to register metrics")?;

    let pool = db::make_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;

    let store = PgEventStore::new(pool, config.events_table.clone());
    let service = EventQueryService::new(
        Arc::new(store),
        config.device_id.clone(),
        config.timezone,
        config.store_timeout,
    );

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(service));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr))?;

    info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("HTTP server error: {}", e);
            e
        })?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
