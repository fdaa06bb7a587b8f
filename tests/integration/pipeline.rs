//! End-to-end pipeline tests over mock sources.

use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use taixiu_predictor::analysis::PatternAnalyzer;
use taixiu_predictor::config::AppConfig;
use taixiu_predictor::engine::advisor::fallback_advice;
use taixiu_predictor::engine::warmer::warm_once;
use taixiu_predictor::engine::Predictor;
use taixiu_predictor::scoring::Scorer;
use taixiu_predictor::types::{ConfidenceTier, Outcome, OutcomeRecord};

use crate::mock_sources::{history_from_pattern, MockGenerator, MockHistory, VALID_ADVICE};

fn config() -> AppConfig {
    AppConfig::default()
}

/// Config with both freshness windows disabled, so every call recomputes.
fn uncached_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.cache.ttl_ms = 0;
    cfg.history.cache_ttl_ms = 0;
    cfg
}

fn predictor(cfg: &AppConfig, history: &MockHistory, generator: Option<&MockGenerator>) -> Predictor {
    Predictor::with_sources(
        cfg,
        Arc::new(history.clone()),
        generator.map(|g| Arc::new(g.clone()) as Arc<dyn taixiu_predictor::llm::TextGenerator>),
    )
}

#[tokio::test]
async fn test_two_calls_within_window_are_identical() {
    let history = MockHistory::new(history_from_pattern("TTXTXXTTTXTXTTXXTXTT", 900));
    let p = predictor(&config(), &history, None);

    let first = p.predict().await;
    let second = p.predict().await;

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.report, second.report);
    assert_eq!(history.calls(), 1);
}

#[tokio::test]
async fn test_uniform_tai_history() {
    let records: Vec<OutcomeRecord> = (1..=20)
        .map(|i| OutcomeRecord::new(i, Outcome::Tai, 12))
        .collect();
    let history = MockHistory::new(records);
    let p = predictor(&config(), &history, None);

    let report = assert_ok!(p.generate().await);
    assert_eq!(report.prediction, Outcome::Tai);
    assert_eq!(report.confidence, ConfidenceTier::High);
    assert_eq!(report.info.algorithm_confidence.as_deref(), Some("93.5%"));
    assert_eq!(report.info.tai_history_ratio.as_deref(), Some("100.0%"));
    assert_eq!(report.session, 20);
    // The sequence factor leans against the 20-long Tài run.
    assert!(report.decisive_factors[1].contains("đảo chiều"));
}

#[tokio::test]
async fn test_prose_advice_falls_back_to_scorer() {
    let records = history_from_pattern("TXTTXXXTXTTTXTXXTXTX", 100);
    let history = MockHistory::new(records.clone());
    let generator = MockGenerator::replying("Theo tôi phiên sau sẽ ra Tài, chúc may mắn.");
    let p = predictor(&config(), &history, Some(&generator));

    let report = assert_ok!(p.generate().await);

    let analysis = PatternAnalyzer::default().analyze(&records).unwrap();
    let expected = fallback_advice(&Scorer::default().score(&analysis));

    assert_eq!(generator.calls(), 1);
    assert!(!report.info.ai_enhanced);
    assert_eq!(report.prediction, expected.prediction);
    assert_eq!(report.confidence, expected.confidence);
    assert_eq!(report.explanation, expected.explanation);
    assert_eq!(report.deep_analysis, expected.deep_analysis);
    assert_eq!(report.risk_note, expected.risk_note);
    assert_eq!(report.decisive_factors, expected.decisive_factors);
}

#[tokio::test]
async fn test_live_advice_is_used() {
    let history = MockHistory::new(history_from_pattern("TTTTTTTTTT", 1));
    let generator = MockGenerator::replying(VALID_ADVICE);
    let p = predictor(&config(), &history, Some(&generator));

    let report = assert_ok!(p.generate().await);
    assert!(report.info.ai_enhanced);
    assert_eq!(report.prediction, Outcome::Xiu);
    assert_eq!(report.confidence, ConfidenceTier::High);
    assert_eq!(report.decisive_factors, vec!["Chuỗi dài", "Xác suất chuyển tiếp"]);
}

#[tokio::test]
async fn test_generator_error_falls_back() {
    let history = MockHistory::new(history_from_pattern("TXTXTXTXTX", 1));
    let generator = MockGenerator::failing("HTTP 503: overloaded");
    let p = predictor(&config(), &history, Some(&generator));

    let report = assert_ok!(p.generate().await);
    assert!(!report.info.ai_enhanced);
    assert!(report
        .explanation
        .starts_with("Dự đoán dựa trên phân tích thuật toán: "));
}

#[tokio::test]
async fn test_short_history_yields_emergency_report() {
    let history = MockHistory::new(history_from_pattern("TX", 1));
    let p = predictor(&config(), &history, None);

    assert_err!(p.generate().await);

    let served = p.predict().await;
    assert!(served.report.info.emergency);
    assert_eq!(served.report.prediction, Outcome::Tai);
    assert_eq!(served.report.confidence, ConfidenceTier::Low);
    assert_eq!((served.report.session, served.report.next_session), (0, 1));
    assert!(served.report.info.error.is_some());
}

#[tokio::test]
async fn test_four_records_get_default_prediction() {
    let history = MockHistory::new(history_from_pattern("XXXX", 1));
    let generator = MockGenerator::replying(VALID_ADVICE);
    let p = predictor(&config(), &history, Some(&generator));

    let served = p.predict().await;
    assert!(!served.report.info.emergency);
    assert_eq!(served.report.prediction, Outcome::Tai);
    assert_eq!(served.report.confidence, ConfidenceTier::Low);
    assert_eq!(served.report.info.algorithm_confidence.as_deref(), Some("50.0%"));
    assert_eq!(served.report.next_session, 5);
    assert_eq!(generator.calls(), 0);
    assert!(p.cache().peek().await.is_some());
}

#[tokio::test]
async fn test_failed_compute_keeps_valid_cache_entry() {
    let history = MockHistory::new(history_from_pattern("TTXXTTXXTT", 40));
    let p = predictor(&uncached_config(), &history, None);

    let good = p.predict().await;
    assert!(!good.report.info.emergency);

    history.set_records(history_from_pattern("TX", 1));
    let degraded = p.predict().await;
    assert!(degraded.report.info.emergency);

    let entry = p.cache().peek().await.unwrap();
    assert_eq!(entry.report, good.report);
}

#[tokio::test]
async fn test_upstream_outage_serves_stale_history() {
    let history = MockHistory::new(history_from_pattern("TXXTXTTXTX", 70));
    let p = predictor(&uncached_config(), &history, None);

    let before = assert_ok!(p.generate().await);

    history.set_error("connection reset");
    let during = assert_ok!(p.generate().await);
    assert_eq!(during.session, before.session);
    assert_eq!(history.calls(), 2);

    history.clear_error();
    history.set_records(history_from_pattern("TXXTXTTXTXT", 70));
    let after = assert_ok!(p.generate().await);
    assert_eq!(after.session, 80);
}

#[tokio::test]
async fn test_warm_then_predict_hits_cache() {
    let history = MockHistory::new(history_from_pattern("XXTXTTXTXX", 300));
    let p = predictor(&config(), &history, None);

    assert!(warm_once(&p).await);
    let served = p.predict().await;
    assert!(served.cached);
    assert_eq!(served.report.session, 309);
    assert_eq!(history.calls(), 1);
}

#[tokio::test]
async fn test_warm_failure_leaves_cache_empty() {
    let history = MockHistory::new(Vec::new());
    let p = predictor(&config(), &history, None);

    assert!(!warm_once(&p).await);
    assert!(p.cache().peek().await.is_none());
}
