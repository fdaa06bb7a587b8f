//! Shared types for the Tài/Xỉu predictor.
//!
//! These types form the data model used across all modules. History
//! records mirror the upstream feed's wire format; analysis and scoring
//! types serialize into the JSON the HTTP API returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// One of the two labelled game outcomes.
///
/// Tài ("big") covers dice totals 11–18, Xỉu ("small") covers 3–10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Tai,
    Xiu,
}

impl Outcome {
    /// The opposite outcome.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Tai => Outcome::Xiu,
            Outcome::Xiu => Outcome::Tai,
        }
    }

    /// Upstream label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Tai => "TÀI",
            Outcome::Xiu => "XỈU",
        }
    }

    /// Human-readable name used in rationale strings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Outcome::Tai => "Tài",
            Outcome::Xiu => "Xỉu",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Parse an outcome label (case-insensitive, accents optional).
impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TÀI" | "TAI" => Ok(Outcome::Tai),
            "XỈU" | "XIU" => Ok(Outcome::Xiu),
            _ => Err(anyhow::anyhow!("Unknown outcome label: {s}")),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Lenient deserializer for the upstream result label: anything that is
/// not a recognised label (missing, empty, null, garbage) becomes `None`.
fn deserialize_lenient_outcome<'de, D>(deserializer: D) -> Result<Option<Outcome>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok()))
}

/// Integer view of a feed value: numbers and numeric strings parse, anything
/// else (null, garbage) is 0.
fn lenient_integer(raw: Option<serde_json::Value>) -> i64 {
    match raw {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn deserialize_lenient_session<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(u64::try_from(lenient_integer(raw)).unwrap_or(0))
}

fn deserialize_lenient_total<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(lenient_integer(raw))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One historical game result as delivered by the history feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(default, deserialize_with = "deserialize_lenient_session")]
    pub session: u64,
    /// `None` when the feed delivered an unrecognised label.
    #[serde(
        rename = "resultVanNhat",
        alias = "result",
        default,
        deserialize_with = "deserialize_lenient_outcome"
    )]
    pub result: Option<Outcome>,
    /// Dice total, 3–18 for a well-formed record.
    #[serde(default, deserialize_with = "deserialize_lenient_total")]
    pub total: i64,
}

impl OutcomeRecord {
    pub fn new(session: u64, result: Outcome, total: i64) -> Self {
        Self {
            session,
            result: Some(result),
            total,
        }
    }
}

impl fmt::Display for OutcomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.result.map(|o| o.label()).unwrap_or("?");
        write!(f, "#{} {} ({})", self.session, label, self.total)
    }
}

/// Chronologically ordered history; the last element is the latest game.
pub type OutcomeSequence = Vec<OutcomeRecord>;

// ---------------------------------------------------------------------------
// Analysis results
// ---------------------------------------------------------------------------

/// Direction of the short-term trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "TÀI")]
    Tai,
    #[serde(rename = "XỈU")]
    Xiu,
    #[serde(rename = "CÂN BẰNG")]
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub trend: Trend,
    /// |count(Tài) − count(Xỉu)| / len, in [0, 1].
    pub strength: f64,
    pub details: String,
}

/// A completed run of identical outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSegment {
    #[serde(rename = "type")]
    pub kind: Option<Outcome>,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceAnalysis {
    pub current_streak: usize,
    pub current_type: Option<Outcome>,
    pub max_tai_streak: usize,
    pub max_xiu_streak: usize,
    pub alternating_patterns: usize,
    pub streak_history: Vec<StreakSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub mean: f64,
    pub min: i64,
    pub max: i64,
    /// Population standard deviation (divides by N).
    pub std_dev: f64,
    pub variance: f64,
    /// Occurrences of every total in 3..=18; absent totals map to 0.
    pub distribution: BTreeMap<i64, usize>,
    pub tai_count: usize,
    pub xiu_count: usize,
    pub total_count: usize,
}

/// Markov-style transition frequencies over the trailing 30 games.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityModel {
    pub after_tai_tai: f64,
    pub after_tai_xiu: f64,
    pub after_xiu_tai: f64,
    pub after_xiu_xiu: f64,
    pub streak_break: f64,
}

impl ProbabilityModel {
    /// (P(next = Tài), P(next = Xỉu)) given the previous outcome.
    pub fn after(&self, previous: Outcome) -> (f64, f64) {
        match previous {
            Outcome::Tai => (self.after_tai_tai, self.after_tai_xiu),
            Outcome::Xiu => (self.after_xiu_tai, self.after_xiu_xiu),
        }
    }
}

/// Everything the pattern analyzer derives from one history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tai_ratio: f64,
    pub xiu_ratio: f64,
    pub recent_trend: TrendResult,
    pub sequences: SequenceAnalysis,
    pub statistics: StatisticalSummary,
    pub probabilities: ProbabilityModel,
    pub total_games: usize,
    pub analysis_timestamp: String,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Weight applied to each scoring factor. Sums to 1.0 by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub trend: f64,
    pub sequence: f64,
    pub statistics: f64,
    pub probability: f64,
    pub ratio: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            trend: 0.25,
            sequence: 0.20,
            statistics: 0.25,
            probability: 0.20,
            ratio: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.trend + self.sequence + self.statistics + self.probability + self.ratio
    }
}

/// Output of the weighted multi-factor scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPrediction {
    pub prediction: Outcome,
    /// Probability of the predicted outcome.
    pub confidence: f64,
    pub tai_probability: f64,
    pub xiu_probability: f64,
    pub reasons: Vec<String>,
    pub tai_score: f64,
    pub xiu_score: f64,
    pub weights: ScoringWeights,
    /// Set when the analyzer had too little history and the default was used.
    #[serde(default)]
    pub insufficient_data: bool,
}

impl ScoredPrediction {
    /// Qualitative tier for the numeric confidence.
    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }
}

impl fmt::Display for ScoredPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conf={:.1}% (Tài {:.1}% / Xỉu {:.1}%)",
            self.prediction,
            self.confidence * 100.0,
            self.tai_probability * 100.0,
            self.xiu_probability * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Advisory
// ---------------------------------------------------------------------------

/// Qualitative confidence tier reported to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    #[serde(rename = "cao")]
    High,
    #[serde(rename = "trung_bình")]
    Medium,
    #[serde(rename = "thấp")]
    Low,
}

impl ConfidenceTier {
    /// >0.7 high, >0.6 medium, otherwise low.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            ConfidenceTier::High
        } else if confidence > 0.6 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "cao"),
            ConfidenceTier::Medium => write!(f, "trung_bình"),
            ConfidenceTier::Low => write!(f, "thấp"),
        }
    }
}

impl std::str::FromStr for ConfidenceTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "cao" | "high" => Ok(ConfidenceTier::High),
            "trung_bình" | "trung_binh" | "medium" => Ok(ConfidenceTier::Medium),
            "thấp" | "thap" | "low" => Ok(ConfidenceTier::Low),
            _ => Err(anyhow::anyhow!("Unknown confidence tier: {s}")),
        }
    }
}

/// Whether an enriched result came from the live service or the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorySource {
    Live,
    Fallback,
}

/// Natural-language elaboration of a scored prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub prediction: Outcome,
    pub confidence: ConfidenceTier,
    pub explanation: String,
    pub deep_analysis: String,
    pub risk_note: String,
    pub decisive_factors: Vec<String>,
    pub source: AdvisorySource,
}

impl EnrichedResult {
    pub fn is_fallback(&self) -> bool {
        self.source == AdvisorySource::Fallback
    }
}

// ---------------------------------------------------------------------------
// Prediction report
// ---------------------------------------------------------------------------

/// Service identifier carried by every report.
pub const SERVICE_ID: &str = "VanNhatZzz";

/// Version string reported by the API.
pub const SERVICE_VERSION: &str = "2.0.0";

/// Metadata accompanying a prediction. Field names on the wire follow the
/// public API consumers already parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryInfo {
    pub prediction_id: String,
    /// Scorer confidence formatted as a percentage, e.g. "63.2%".
    #[serde(rename = "do_tin_cay_thuat_toan", skip_serializing_if = "Option::is_none")]
    pub algorithm_confidence: Option<String>,
    #[serde(rename = "tong_so_du_lieu", skip_serializing_if = "Option::is_none")]
    pub total_games: Option<usize>,
    #[serde(rename = "ty_le_tai_history", skip_serializing_if = "Option::is_none")]
    pub tai_history_ratio: Option<String>,
    #[serde(rename = "ty_le_xiu_history", skip_serializing_if = "Option::is_none")]
    pub xiu_history_ratio: Option<String>,
    #[serde(rename = "xu_huong_gan_nhat", skip_serializing_if = "Option::is_none")]
    pub latest_trend: Option<String>,
    pub timestamp: String,
    pub version: String,
    pub ai_enhanced: bool,
    #[serde(default)]
    pub emergency: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The full result of one pipeline run, as returned by `/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub id: String,
    pub session: u64,
    pub next_session: u64,
    #[serde(rename = "predictVanNhat")]
    pub prediction: Outcome,
    pub confidence: ConfidenceTier,
    #[serde(rename = "giai_thich")]
    pub explanation: String,
    #[serde(rename = "phan_tich_chuyen_sau")]
    pub deep_analysis: String,
    #[serde(rename = "luu_y")]
    pub risk_note: String,
    #[serde(rename = "yeu_to_quyet_dinh")]
    pub decisive_factors: Vec<String>,
    #[serde(rename = "thong_tin_bo_sung")]
    pub info: SupplementaryInfo,
}

impl fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} → {} [{}]{}",
            self.next_session,
            self.prediction,
            self.confidence,
            if self.info.emergency { " (emergency)" } else { "" },
        )
    }
}

/// A stored report with its capture time. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPrediction {
    pub report: PredictionReport,
    pub captured_at: DateTime<Utc>,
}

/// A report as served to a caller, tagged with cache metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedPrediction {
    #[serde(flatten)]
    pub report: PredictionReport,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age: Option<String>,
}

/// Local wall-clock timestamp in the format the API reports.
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the predictor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictorError {
    #[error("Insufficient data: need at least {required} records, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("History fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Advisory service error: {0}")]
    Advisory(String),

    #[error("Pipeline failure: {0}")]
    Pipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
