// =============================================================================
// Crossover Signals — Main Entry Point
// =============================================================================
//
// Serves moving-average crossover analysis over HTTP. Each request runs the
// pipeline price source -> signal engine -> {chart data, position tracker}
// on its own data; the only shared state is the analysis config.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod chart;
mod error;
mod indicators;
mod market_data;
mod position_tracker;
mod runtime_config;
mod signal_engine;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::YahooChartClient;
use crate::runtime_config::AnalysisConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Crossover Signals — starting up");

    let config_path = std::env::var("SIGNAL_CONFIG_PATH")
        .unwrap_or_else(|_| "analysis_config.json".into());

    let mut config = AnalysisConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AnalysisConfig::default()
    });

    // Override symbols from env if available.
    if let Ok(syms) = std::env::var("SIGNAL_SYMBOLS") {
        config.apply_symbol_override(&syms);
    }

    info!(
        symbols = ?config.symbols,
        short_window = config.short_window,
        long_window = config.long_window,
        lookback_days = config.lookback_days,
        "Analysis defaults"
    );

    // ── 2. Price source ──────────────────────────────────────────────────
    let price_source = Arc::new(
        YahooChartClient::new(config.price_api_base_url.clone())
            .context("failed to initialise price source")?,
    );

    // ── 3. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, config_path, price_source));

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("SIGNAL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, api::rest::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!(
        analyses = state.analyses_completed(),
        "Crossover Signals shut down complete."
    );
    Ok(())
}

/// Resolve on Ctrl+C. If the handler cannot be installed the server keeps
/// running until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
