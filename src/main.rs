mod config;
mod error;
mod flows;
mod gemini;
mod models;
mod routes;
mod schema;
mod store;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, flows::AiFlows, gemini::GeminiClient, routes::AppState, store::Stores};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("loading configuration")?;
    match config.api_key_summary() {
        Some(summary) => tracing::info!("🔑 GEMINI_API_KEY {}", summary),
        None => tracing::warn!("GEMINI_API_KEY not set; AI flows will fail until it is configured"),
    }

    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_api_base.clone());
    let state = AppState {
        stores: Arc::new(Stores::open(&config).context("opening stores")?),
        flows: Arc::new(AiFlows::new(Arc::new(gemini), &config)),
    };

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
