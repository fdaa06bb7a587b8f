//! Pattern analysis: trend, streaks, statistics and transition model.
//!
//! Takes the full chronological history and derives every feature the
//! scorer needs from its recent windows. Pure and synchronous; no state is
//! carried between calls.

pub mod probability;
pub mod sequence;
pub mod statistics;
pub mod trend;

use tracing::debug;

use crate::types::{local_timestamp, AnalysisResult, Outcome, OutcomeRecord, PredictorError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Window sizes used by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// Minimum history length required to analyse at all.
    pub min_records: usize,
    /// Trailing records used for ratios, sequences and statistics.
    pub window: usize,
    /// Trailing records of the window used for the trend.
    pub trend_window: usize,
    /// Trailing records of the full history used for transitions.
    pub transition_window: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_records: 5,
            window: 20,
            trend_window: 10,
            transition_window: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

pub struct PatternAnalyzer {
    config: AnalyzerConfig,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl PatternAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse the trailing windows of `history`.
    ///
    /// Fails with [`PredictorError::InsufficientData`] when the history is
    /// shorter than `min_records`.
    pub fn analyze(&self, history: &[OutcomeRecord]) -> Result<AnalysisResult, PredictorError> {
        if history.len() < self.config.min_records {
            return Err(PredictorError::InsufficientData {
                required: self.config.min_records,
                available: history.len(),
            });
        }

        let window = tail(history, self.config.window);
        let results: Vec<Option<Outcome>> = window.iter().map(|r| r.result).collect();
        let totals: Vec<i64> = window.iter().map(|r| r.total).collect();

        let games = results.len();
        let tai = results.iter().filter(|r| **r == Some(Outcome::Tai)).count();
        let xiu = results.iter().filter(|r| **r == Some(Outcome::Xiu)).count();

        let transition_results: Vec<Option<Outcome>> = tail(history, self.config.transition_window)
            .iter()
            .map(|r| r.result)
            .collect();

        let analysis = AnalysisResult {
            tai_ratio: tai as f64 / games as f64,
            xiu_ratio: xiu as f64 / games as f64,
            recent_trend: trend::recent_trend(tail(&results, self.config.trend_window)),
            sequences: sequence::analyze_sequences(&results),
            statistics: statistics::summarize(&totals),
            probabilities: probability::transition_model(&transition_results),
            total_games: games,
            analysis_timestamp: local_timestamp(),
        };

        debug!(
            games,
            tai,
            xiu,
            trend = ?analysis.recent_trend.trend,
            streak = analysis.sequences.current_streak,
            mean = format!("{:.2}", analysis.statistics.mean),
            "Pattern analysis complete"
        );

        Ok(analysis)
    }
}

/// The last `n` elements of `items` (all of them if shorter).
pub(crate) fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
