//! Freshness cache for the last computed prediction.
//!
//! Holds at most one `Arc<CachedPrediction>`. Entries are swapped
//! wholesale under a short write lock, so readers see either the old or
//! the new report, never a mix. Compute failures are never cached.

use anyhow::Result;
use chrono::{TimeDelta, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::types::{
    local_timestamp, CachedPrediction, ConfidenceTier, Outcome, PredictionReport,
    ServedPrediction, SupplementaryInfo, SERVICE_ID, SERVICE_VERSION,
};

pub struct PredictionCache {
    ttl: TimeDelta,
    entry: RwLock<Option<Arc<CachedPrediction>>>,
}

impl PredictionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entry: RwLock::new(None),
        }
    }

    /// Serve the cached report if fresh, otherwise run `compute`.
    ///
    /// No lock is held while `compute` runs; concurrent misses each compute
    /// and the last one to finish wins.
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> ServedPrediction
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PredictionReport>>,
    {
        if let Some(served) = self.fresh().await {
            debug!(cache_age = ?served.cache_age, "Serving cached prediction");
            return served;
        }

        match compute().await {
            Ok(report) => {
                self.store(report.clone()).await;
                ServedPrediction {
                    report,
                    cached: false,
                    cache_age: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Prediction failed, serving emergency report");
                ServedPrediction {
                    report: emergency_report(&e.to_string()),
                    cached: false,
                    cache_age: None,
                }
            }
        }
    }

    /// Replace the cached entry.
    pub async fn store(&self, report: PredictionReport) {
        let entry = Arc::new(CachedPrediction {
            report,
            captured_at: Utc::now(),
        });
        info!(report = %entry.report, "Prediction cached");
        *self.entry.write().await = Some(entry);
    }

    /// Current entry, fresh or not.
    pub async fn peek(&self) -> Option<Arc<CachedPrediction>> {
        self.entry.read().await.clone()
    }

    async fn fresh(&self) -> Option<ServedPrediction> {
        let entry = self.peek().await?;
        let age = Utc::now() - entry.captured_at;
        if age >= self.ttl {
            return None;
        }
        let secs = (age.num_milliseconds() as f64 / 1000.0).round() as i64;
        Some(ServedPrediction {
            report: entry.report.clone(),
            cached: true,
            cache_age: Some(format!("{secs}s")),
        })
    }
}

/// Degraded report returned when the pipeline fails.
pub fn emergency_report(error: &str) -> PredictionReport {
    PredictionReport {
        id: SERVICE_ID.to_string(),
        session: 0,
        next_session: 1,
        prediction: Outcome::Tai,
        confidence: ConfidenceTier::Low,
        explanation: format!("Hệ thống tạm thời gặp sự cố: {error}"),
        deep_analysis: "Không thể phân tích do lỗi hệ thống. Vui lòng thử lại sau.".to_string(),
        risk_note: "Dự đoán tạm thời không khả dụng.".to_string(),
        decisive_factors: Vec::new(),
        info: SupplementaryInfo {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            algorithm_confidence: None,
            total_games: None,
            tai_history_ratio: None,
            xiu_history_ratio: None,
            latest_trend: None,
            timestamp: local_timestamp(),
            version: SERVICE_VERSION.to_string(),
            ai_enhanced: false,
            emergency: true,
            error: Some(error.to_string()),
        },
    }
}
