//! Prediction pipeline.
//!
//! history → analysis → scoring → advisory enrichment → report, served
//! through the freshness cache. `Predictor` owns every stage and is shared
//! as `Arc<Predictor>` by the HTTP handlers and the cache warmer.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};

use super::advisor::{fallback_advice, AdvisoryEnricher};
use super::cache::PredictionCache;
use crate::analysis::PatternAnalyzer;
use crate::config::AppConfig;
use crate::history::http::HttpHistorySource;
use crate::history::{HistorySource, HistoryStore};
use crate::llm::deepseek::DeepSeekClient;
use crate::llm::TextGenerator;
use crate::scoring::Scorer;
use crate::types::{
    local_timestamp, AnalysisResult, OutcomeRecord, OutcomeSequence, PredictionReport,
    PredictorError, ServedPrediction, SupplementaryInfo, SERVICE_ID, SERVICE_VERSION,
};

/// Fewer records than this and the pipeline refuses to run.
pub const MIN_HISTORY: usize = 3;

const NOT_ENOUGH_HISTORY: &str = "Không đủ dữ liệu lịch sử để phân tích";

pub struct Predictor {
    history: HistoryStore,
    analyzer: PatternAnalyzer,
    scorer: Scorer,
    enricher: AdvisoryEnricher,
    cache: PredictionCache,
}

impl Predictor {
    pub fn new(
        history: HistoryStore,
        analyzer: PatternAnalyzer,
        scorer: Scorer,
        enricher: AdvisoryEnricher,
        cache: PredictionCache,
    ) -> Self {
        Self {
            history,
            analyzer,
            scorer,
            enricher,
            cache,
        }
    }

    /// Wire the pipeline around the given sources using `config` for
    /// windows, timeouts and weights. `None` disables advisory enrichment.
    pub fn with_sources(
        config: &AppConfig,
        source: Arc<dyn HistorySource>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let history = HistoryStore::new(
            source,
            config.history.cache_ttl(),
            config.history.timeout(),
        );
        let enricher = match generator {
            Some(g) if config.advisory.enabled => {
                AdvisoryEnricher::new(g, config.advisory.timeout())
            }
            _ => AdvisoryEnricher::disabled(),
        };

        Self::new(
            history,
            PatternAnalyzer::default(),
            Scorer::new(config.scoring),
            enricher,
            PredictionCache::new(config.cache.ttl()),
        )
    }

    /// Build the production pipeline: HTTP history feed plus DeepSeek when
    /// advisory is enabled and its API key is set.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = HttpHistorySource::new(config.history.url.clone(), config.history.timeout())
            .context("Failed to create history source")?;

        let generator: Option<Arc<dyn TextGenerator>> = if !config.advisory.enabled {
            info!("Advisory enrichment disabled by config");
            None
        } else {
            match AppConfig::resolve_env(&config.advisory.api_key_env) {
                Ok(key) if !key.trim().is_empty() => {
                    let client: Arc<dyn TextGenerator> = Arc::new(
                        DeepSeekClient::from_config(&config.advisory, SecretString::new(key))
                            .context("Failed to create advisory client")?,
                    );
                    info!(model = client.model_name(), "Advisory enrichment enabled");
                    Some(client)
                }
                _ => {
                    warn!(
                        env = %config.advisory.api_key_env,
                        "Advisory API key not set, predictions will use scorer rationale only"
                    );
                    None
                }
            }
        };

        Ok(Self::with_sources(config, Arc::new(source), generator))
    }

    /// Run the full pipeline once, bypassing the cache.
    pub async fn generate(&self) -> Result<PredictionReport> {
        info!("Generating prediction");

        let history = self.history.get_history().await;
        if history.len() < MIN_HISTORY {
            return Err(PredictorError::Pipeline(NOT_ENOUGH_HISTORY.to_string()).into());
        }

        let analysis = match self.analyzer.analyze(&history) {
            Ok(analysis) => Ok(analysis),
            Err(e @ PredictorError::InsufficientData { .. }) => {
                warn!(error = %e, "Short history, using the default prediction");
                Err(e)
            }
            Err(e) => return Err(PredictorError::Pipeline(e.to_string()).into()),
        };
        let scored = self.scorer.score_result(&analysis);
        let advice = match &analysis {
            Ok(analysis) => self.enricher.enrich(&history, analysis, &scored).await,
            Err(_) => fallback_advice(&scored),
        };
        let ai_enhanced = !advice.is_fallback();

        let latest_session = history.iter().map(|r| r.session).max().unwrap_or(0);
        let analysis = analysis.ok();

        let report = PredictionReport {
            id: SERVICE_ID.to_string(),
            session: latest_session,
            next_session: latest_session + 1,
            prediction: advice.prediction,
            confidence: advice.confidence,
            explanation: advice.explanation,
            deep_analysis: advice.deep_analysis,
            risk_note: advice.risk_note,
            decisive_factors: advice.decisive_factors,
            info: SupplementaryInfo {
                prediction_id: uuid::Uuid::new_v4().to_string(),
                algorithm_confidence: Some(format!("{:.1}%", scored.confidence * 100.0)),
                total_games: analysis.as_ref().map(|a| a.total_games),
                tai_history_ratio: analysis
                    .as_ref()
                    .map(|a| format!("{:.1}%", a.tai_ratio * 100.0)),
                xiu_history_ratio: analysis
                    .as_ref()
                    .map(|a| format!("{:.1}%", a.xiu_ratio * 100.0)),
                latest_trend: analysis.as_ref().map(|a| a.recent_trend.details.clone()),
                timestamp: local_timestamp(),
                version: SERVICE_VERSION.to_string(),
                ai_enhanced,
                emergency: false,
                error: None,
            },
        };

        info!(
            prediction_id = %report.info.prediction_id,
            next_session = report.next_session,
            prediction = %report.prediction,
            confidence = %report.confidence,
            ai_enhanced = report.info.ai_enhanced,
            "Prediction complete"
        );

        Ok(report)
    }

    /// Cached prediction, computing a fresh one on a miss.
    pub async fn predict(&self) -> ServedPrediction {
        self.cache.get_or_compute(|| self.generate()).await
    }

    /// Recompute and store unconditionally. Errors leave the cache as is.
    pub async fn warm(&self) -> Result<()> {
        let report = self.generate().await?;
        self.cache.store(report).await;
        Ok(())
    }

    /// Current history through the store's freshness cache.
    pub async fn history(&self) -> Arc<OutcomeSequence> {
        self.history.get_history().await
    }

    pub fn analyze(&self, history: &[OutcomeRecord]) -> Result<AnalysisResult, PredictorError> {
        self.analyzer.analyze(history)
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub fn advisory_enabled(&self) -> bool {
        self.enricher.is_enabled()
    }
}
