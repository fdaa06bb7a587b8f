//! Weighted multi-factor scoring.
//!
//! Fuses the pattern analysis into Tài/Xỉu scores. Each factor splits its
//! weight between the two outcomes; the per-outcome totals are normalised
//! into probabilities and the larger one becomes the prediction.

use serde::Deserialize;
use tracing::debug;

use crate::types::{
    AnalysisResult, Outcome, PredictorError, ScoredPrediction, ScoringWeights, Trend,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Empirical constants of the scoring heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Share of the trend weight given to the trending outcome before
    /// adding the trend strength. The other side gets `1 - trend_base`.
    pub trend_base: f64,
    /// Current streak length at which the reversal bias applies.
    pub reversal_streak_threshold: usize,
    /// Share of the sequence weight given to the outcome opposite the streak.
    pub reversal_bias: f64,
    /// Mean total above which the statistics factor leans Tài.
    pub high_mean_threshold: f64,
    /// Mean total below which the statistics factor leans Xỉu.
    pub low_mean_threshold: f64,
    /// Share of the statistics weight given to the favoured outcome.
    pub mean_bias: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            trend_base: 0.6,
            reversal_streak_threshold: 3,
            reversal_bias: 0.7,
            high_mean_threshold: 10.8,
            low_mean_threshold: 10.2,
            mean_bias: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Rationale used when there is too little history to score.
pub const INSUFFICIENT_DATA_REASON: &str = "Dự đoán mặc định do thiếu dữ liệu (insufficient data)";

/// Running (Tài, Xỉu) totals plus the rationale trail.
#[derive(Debug, Default)]
struct Tally {
    tai: f64,
    xiu: f64,
    reasons: Vec<String>,
}

impl Tally {
    fn add(&mut self, tai: f64, xiu: f64, reason: String) {
        self.tai += tai;
        self.xiu += xiu;
        self.reasons.push(reason);
    }

    /// Add `weight` split as `favoured_share` to `favoured` and the rest
    /// to the other outcome.
    fn lean(&mut self, favoured: Outcome, weight: f64, favoured_share: f64, reason: String) {
        let (fav, other) = (weight * favoured_share, weight * (1.0 - favoured_share));
        match favoured {
            Outcome::Tai => self.add(fav, other, reason),
            Outcome::Xiu => self.add(other, fav, reason),
        }
    }
}

pub struct Scorer {
    config: ScoringConfig,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score the analyzer's output, short-circuiting to the default
    /// prediction when the analyzer reported insufficient data.
    pub fn score_result(&self, analysis: &Result<AnalysisResult, PredictorError>) -> ScoredPrediction {
        match analysis {
            Ok(a) => self.score(a),
            Err(_) => self.insufficient_data(),
        }
    }

    /// Default prediction: Tài at exactly 50%.
    pub fn insufficient_data(&self) -> ScoredPrediction {
        ScoredPrediction {
            prediction: Outcome::Tai,
            confidence: 0.5,
            tai_probability: 0.5,
            xiu_probability: 0.5,
            reasons: vec![INSUFFICIENT_DATA_REASON.to_string()],
            tai_score: 0.0,
            xiu_score: 0.0,
            weights: self.config.weights,
            insufficient_data: true,
        }
    }

    /// Run all five factors over `analysis`.
    pub fn score(&self, analysis: &AnalysisResult) -> ScoredPrediction {
        let mut tally = Tally::default();

        self.trend_factor(analysis, &mut tally);
        self.sequence_factor(analysis, &mut tally);
        self.statistics_factor(analysis, &mut tally);
        self.probability_factor(analysis, &mut tally);
        self.ratio_factor(analysis, &mut tally);

        let total = tally.tai + tally.xiu;
        let tai_probability = if total > 0.0 {
            (tally.tai / total).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let xiu_probability = 1.0 - tai_probability;

        let (prediction, confidence) = if tai_probability > xiu_probability {
            (Outcome::Tai, tai_probability)
        } else {
            (Outcome::Xiu, xiu_probability)
        };

        debug!(
            tai_score = format!("{:.4}", tally.tai),
            xiu_score = format!("{:.4}", tally.xiu),
            prediction = %prediction,
            confidence = format!("{:.1}%", confidence * 100.0),
            "Scoring complete"
        );

        ScoredPrediction {
            prediction,
            confidence,
            tai_probability,
            xiu_probability,
            reasons: tally.reasons,
            tai_score: tally.tai,
            xiu_score: tally.xiu,
            weights: self.config.weights,
            insufficient_data: false,
        }
    }

    fn trend_factor(&self, analysis: &AnalysisResult, tally: &mut Tally) {
        let w = self.config.weights.trend;
        let trend = &analysis.recent_trend;
        let base = self.config.trend_base;

        match trend.trend {
            Trend::Tai => tally.add(
                w * (base + trend.strength),
                w * (1.0 - base - trend.strength),
                format!("📈 Xu hướng nghiêng Tài ({})", trend.details),
            ),
            Trend::Xiu => tally.add(
                w * (1.0 - base - trend.strength),
                w * (base + trend.strength),
                format!("📉 Xu hướng nghiêng Xỉu ({})", trend.details),
            ),
            Trend::Balanced => tally.add(w * 0.5, w * 0.5, "⚖️ Xu hướng cân bằng".to_string()),
        }
    }

    fn sequence_factor(&self, analysis: &AnalysisResult, tally: &mut Tally) {
        let w = self.config.weights.sequence;
        let seq = &analysis.sequences;

        match seq.current_type {
            Some(kind) if seq.current_streak >= self.config.reversal_streak_threshold => tally.lean(
                kind.opposite(),
                w,
                self.config.reversal_bias,
                format!(
                    "🔄 Chuỗi {} {} - Dự báo đảo chiều",
                    kind.display_name(),
                    seq.current_streak
                ),
            ),
            current => {
                let name = current.map(|k| k.display_name()).unwrap_or("?");
                tally.add(
                    w * 0.5,
                    w * 0.5,
                    format!("📊 Chuỗi hiện tại: {} {}", name, seq.current_streak),
                );
            }
        }
    }

    fn statistics_factor(&self, analysis: &AnalysisResult, tally: &mut Tally) {
        let w = self.config.weights.statistics;
        let mean = analysis.statistics.mean;

        if mean > self.config.high_mean_threshold {
            tally.lean(
                Outcome::Tai,
                w,
                self.config.mean_bias,
                format!("🎯 Điểm trung bình cao ({mean:.2}) - Nghiêng Tài"),
            );
        } else if mean < self.config.low_mean_threshold {
            tally.lean(
                Outcome::Xiu,
                w,
                self.config.mean_bias,
                format!("🎯 Điểm trung bình thấp ({mean:.2}) - Nghiêng Xỉu"),
            );
        } else {
            tally.add(
                w * 0.5,
                w * 0.5,
                format!("🎯 Điểm trung bình cân bằng ({mean:.2})"),
            );
        }
    }

    fn probability_factor(&self, analysis: &AnalysisResult, tally: &mut Tally) {
        let w = self.config.weights.probability;

        match analysis.sequences.current_type {
            Some(last) => {
                let (p_tai, p_xiu) = analysis.probabilities.after(last);
                tally.add(
                    w * p_tai,
                    w * p_xiu,
                    format!(
                        "🎲 Xác suất sau {}: Tài {:.1}% - Xỉu {:.1}%",
                        last.display_name(),
                        p_tai * 100.0,
                        p_xiu * 100.0
                    ),
                );
            }
            None => tally.add(
                0.0,
                0.0,
                "🎲 Không xác định được kết quả gần nhất - bỏ qua xác suất chuyển tiếp".to_string(),
            ),
        }
    }

    fn ratio_factor(&self, analysis: &AnalysisResult, tally: &mut Tally) {
        let w = self.config.weights.ratio;
        tally.add(
            w * analysis.tai_ratio,
            w * analysis.xiu_ratio,
            format!(
                "📊 Tỷ lệ lịch sử: Tài {:.1}% - Xỉu {:.1}%",
                analysis.tai_ratio * 100.0,
                analysis.xiu_ratio * 100.0
            ),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
