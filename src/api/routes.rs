//! API route handlers.
//!
//! All endpoints return JSON and never fail at the HTTP level: pipeline
//! problems surface as an emergency report or an `error` field.
//! State is shared via `Arc<ApiState>`.

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::tail;
use crate::engine::Predictor;
use crate::types::{local_timestamp, OutcomeRecord, ServedPrediction, SERVICE_ID, SERVICE_VERSION};

/// Records returned by `/history`.
const HISTORY_LIMIT: usize = 20;

/// Records attached to `/analysis`.
const ANALYSIS_RECENT: usize = 10;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ApiState {
    pub predictor: Arc<Predictor>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self {
            predictor,
            started_at: Instant::now(),
        }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub author: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    /// The analysis, or `{"error": ...}` when the history is too short.
    pub technical_analysis: Value,
    pub recent_history: Vec<OutcomeRecord>,
    pub analysis_timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub data: Vec<OutcomeRecord>,
    pub total: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub rss_bytes: u64,
    pub vms_bytes: u64,
}

impl MemoryUsage {
    /// Current process memory from `/proc/self/statm` (zeros elsewhere).
    pub fn capture() -> Self {
        match std::fs::read_to_string("/proc/self/statm") {
            Ok(content) => Self::parse_statm(&content),
            Err(_) => Self::default(),
        }
    }

    fn parse_statm(content: &str) -> Self {
        const PAGE_SIZE: u64 = 4096;
        let mut fields = content
            .split_whitespace()
            .map(|s| s.parse::<u64>().unwrap_or(0));
        let vms_pages = fields.next().unwrap_or(0);
        let rss_pages = fields.next().unwrap_or(0);
        Self {
            rss_bytes: rss_pages * PAGE_SIZE,
            vms_bytes: vms_pages * PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub memory: MemoryUsage,
    pub version: String,
    pub cached_history: usize,
    pub advisory_enabled: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /
pub async fn index() -> Json<IndexResponse> {
    let endpoints = BTreeMap::from([
        ("/api/taixiu/predict", "Dự đoán kết quả tiếp theo"),
        ("/api/taixiu/analysis", "Phân tích kỹ thuật"),
        ("/api/taixiu/history", "Lịch sử gần đây"),
        ("/api/health", "Health check"),
    ]);

    Json(IndexResponse {
        message: format!("{SERVICE_ID} Tài Xỉu Predictor API"),
        version: SERVICE_VERSION.to_string(),
        endpoints,
        author: SERVICE_ID.to_string(),
        timestamp: local_timestamp(),
    })
}

/// GET /api/taixiu/predict
pub async fn predict(State(state): State<AppState>) -> Json<ServedPrediction> {
    Json(state.predictor.predict().await)
}

/// GET /api/taixiu/analysis
pub async fn analysis(State(state): State<AppState>) -> Json<AnalysisResponse> {
    let history = state.predictor.history().await;

    let technical_analysis = match state.predictor.analyze(&history) {
        Ok(a) => serde_json::to_value(&a).unwrap_or_else(|e| json!({ "error": e.to_string() })),
        Err(e) => json!({ "error": e.to_string() }),
    };

    Json(AnalysisResponse {
        technical_analysis,
        recent_history: tail(history.as_slice(), ANALYSIS_RECENT).to_vec(),
        analysis_timestamp: local_timestamp(),
    })
}

/// GET /api/taixiu/history
pub async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let history = state.predictor.history().await;
    Json(HistoryResponse {
        data: tail(history.as_slice(), HISTORY_LIMIT).to_vec(),
        total: history.len(),
        timestamp: local_timestamp(),
    })
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: local_timestamp(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        memory: MemoryUsage::capture(),
        version: SERVICE_VERSION.to_string(),
        cached_history: state.predictor.history_store().cached_len().await,
        advisory_enabled: state.predictor.advisory_enabled(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statm() {
        let m = MemoryUsage::parse_statm("2000 500 100 10 0 300 0\n");
        assert_eq!(m.vms_bytes, 2000 * 4096);
        assert_eq!(m.rss_bytes, 500 * 4096);
    }

    #[test]
    fn test_parse_statm_garbage() {
        assert_eq!(MemoryUsage::parse_statm(""), MemoryUsage::default());
        assert_eq!(MemoryUsage::parse_statm("x y").rss_bytes, 0);
    }
}
