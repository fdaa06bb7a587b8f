//! Tài/Xỉu predictor — HTTP service entry point.
//!
//! Loads configuration, initialises structured logging, wires the
//! prediction pipeline, starts the cache warmer and serves the API until
//! Ctrl+C or SIGTERM.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use taixiu_predictor::api::{self, ApiState};
use taixiu_predictor::config::AppConfig;
use taixiu_predictor::engine::warmer;
use taixiu_predictor::engine::Predictor;
use taixiu_predictor::types::{SERVICE_ID, SERVICE_VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let mut cfg = AppConfig::load_or_default("config.toml")?;
    cfg.apply_env_overrides();

    info!(
        service = SERVICE_ID,
        version = SERVICE_VERSION,
        port = cfg.server.port,
        history_url = %cfg.history.url,
        cache_ttl_ms = cfg.cache.ttl_ms,
        "Tài/Xỉu predictor starting up"
    );

    let predictor = Arc::new(Predictor::from_config(&cfg)?);

    let warmer = if cfg.scheduler.enabled {
        Some(warmer::spawn_cache_warmer(
            Arc::clone(&predictor),
            cfg.scheduler.interval(),
        ))
    } else {
        info!("Cache warmer disabled by config");
        None
    };

    let state = Arc::new(ApiState::new(predictor));
    api::serve(state, cfg.server.port, shutdown_signal()).await?;

    if let Some(handle) = warmer {
        handle.abort();
    }
    info!("Predictor shut down cleanly.");

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("taixiu_predictor=info"));

    let json_logging = std::env::var("TAIXIU_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
