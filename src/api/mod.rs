//! HTTP API over the shared predictor (axum).
//!
//! Routes are mounted under `/api/taixiu` (plus `/api/health`) with short
//! aliases at the root. CORS allows any origin for GET.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{ApiState, AppState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::index))
        .route("/api/taixiu/predict", get(routes::predict))
        .route("/api/taixiu/analysis", get(routes::analysis))
        .route("/api/taixiu/history", get(routes::history))
        .route("/api/health", get(routes::health))
        // Short aliases
        .route("/predict", get(routes::predict))
        .route("/analysis", get(routes::analysis))
        .route("/history", get(routes::history))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Bind `port` on all interfaces and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;
    info!(port, "API server listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
