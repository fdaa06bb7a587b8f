//! Advisory enrichment.
//!
//! Sends the analysis and the scored prediction to a chat-completion
//! service and asks for a JSON verdict with a natural-language
//! explanation. The call is a resilient wrapper: disabled config, missing
//! key, HTTP errors, timeouts and malformed replies all collapse into the
//! same scorer-derived fallback. `enrich` never returns an error.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm::TextGenerator;
use crate::types::{
    AdvisorySource, AnalysisResult, ConfidenceTier, EnrichedResult, Outcome, OutcomeRecord,
    ScoredPrediction,
};

/// Records embedded in the prompt.
pub const PROMPT_WINDOW: usize = 15;

const FALLBACK_EXPLANATION_PREFIX: &str = "Dự đoán dựa trên phân tích thuật toán: ";
const FALLBACK_DEEP_ANALYSIS: &str = "Thuật toán phân tích đa yếu tố: xu hướng, chuỗi, thống kê và xác suất. Kết hợp trọng số khoa học để đưa ra dự đoán tối ưu.";
const FALLBACK_RISK_NOTE: &str =
    "Đây là dự đoán tự động, không đảm bảo 100% chính xác. Chơi có trách nhiệm.";

pub struct AdvisoryEnricher {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl AdvisoryEnricher {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator: Some(generator),
            timeout,
        }
    }

    /// An enricher that always answers with the fallback.
    pub fn disabled() -> Self {
        Self {
            generator: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Elaborate on `scored`. Always returns a usable result.
    pub async fn enrich(
        &self,
        history: &[OutcomeRecord],
        analysis: &AnalysisResult,
        scored: &ScoredPrediction,
    ) -> EnrichedResult {
        let Some(generator) = &self.generator else {
            debug!("Advisory disabled, using scorer rationale");
            return fallback_advice(scored);
        };

        let prompt = build_prompt(history, analysis, scored);
        let reply =
            tokio::time::timeout(self.timeout, generator.complete(system_prompt(), &prompt)).await;

        let text = match reply {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(model = generator.model_name(), error = %e, "Advisory call failed, using fallback");
                return fallback_advice(scored);
            }
            Err(_) => {
                warn!(
                    model = generator.model_name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Advisory call timed out, using fallback"
                );
                return fallback_advice(scored);
            }
        };

        match parse_advice(&text) {
            Some(advice) => {
                info!(
                    model = generator.model_name(),
                    prediction = %advice.prediction,
                    confidence = %advice.confidence,
                    "Advisory enrichment applied"
                );
                advice
            }
            None => {
                warn!(
                    model = generator.model_name(),
                    chars = text.len(),
                    "Advisory reply unusable, using fallback"
                );
                fallback_advice(scored)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

pub fn system_prompt() -> &'static str {
    "Bạn là chuyên gia phân tích xác suất Tài Xỉu khách quan. \
     Phân tích dữ liệu một cách trung lập và đưa ra dự đoán có cơ sở. \
     LUÔN trả về JSON hợp lệ."
}

/// Build the user message: recent records, the analysis summary, the
/// scorer's verdict and the JSON schema the reply must follow.
pub fn build_prompt(
    history: &[OutcomeRecord],
    analysis: &AnalysisResult,
    scored: &ScoredPrediction,
) -> String {
    let start = history.len().saturating_sub(PROMPT_WINDOW);
    let recent = serde_json::to_string_pretty(&history[start..]).unwrap_or_default();
    let distribution = serde_json::to_string(&analysis.statistics.distribution).unwrap_or_default();
    let probabilities = serde_json::to_string_pretty(&analysis.probabilities).unwrap_or_default();
    let streak_kind = analysis
        .sequences
        .current_type
        .map_or("N/A", |o| o.label());

    format!(
        "PHÂN TÍCH DỰ ĐOÁN TÀI XỈU\n\
         \n\
         DỮ LIỆU LỊCH SỬ ({window} phiên gần nhất):\n\
         {recent}\n\
         \n\
         PHÂN TÍCH KỸ THUẬT:\n\
         - Tỷ lệ Tài/Xỉu: {tai:.1}% / {xiu:.1}%\n\
         - Xu hướng gần đây: {trend}\n\
         - Chuỗi hiện tại: {streak_kind} ({streak} lượt)\n\
         - Điểm trung bình: {mean:.2}\n\
         - Phân phối điểm: {distribution}\n\
         \n\
         XÁC SUẤT CHUYỂN TIẾP:\n\
         {probabilities}\n\
         \n\
         DỰ ĐOÁN TỪ THUẬT TOÁN:\n\
         - Kết quả: {prediction}\n\
         - Độ tin cậy: {confidence:.1}%\n\
         - Lý do: {reasons}\n\
         \n\
         Hãy đánh giá xu hướng, mẫu hình chuỗi, khả năng đảo chiều và xác suất \
         thống kê, rồi đưa ra dự đoán cuối cùng.\n\
         \n\
         ĐỊNH DẠNG KẾT QUẢ JSON:\n\
         {{\n\
         \x20   \"predictVanNhat\": \"TÀI/XỈU\",\n\
         \x20   \"confidence\": \"cao/trung_bình/thấp\",\n\
         \x20   \"giai_thich\": \"...\",\n\
         \x20   \"phan_tich_chuyen_sau\": \"...\",\n\
         \x20   \"luu_y\": \"...\",\n\
         \x20   \"yeu_to_quyet_dinh\": [\"...\"]\n\
         }}\n",
        window = PROMPT_WINDOW,
        tai = analysis.tai_ratio * 100.0,
        xiu = analysis.xiu_ratio * 100.0,
        trend = analysis.recent_trend.details,
        streak = analysis.sequences.current_streak,
        mean = analysis.statistics.mean,
        prediction = scored.prediction,
        confidence = scored.confidence * 100.0,
        reasons = scored.reasons.join(" | "),
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the substring from the first `{` to the last `}` as JSON.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Turn a reply into an `EnrichedResult`, or `None` unless all six fields
/// are present and valid.
pub fn parse_advice(text: &str) -> Option<EnrichedResult> {
    let obj = extract_json_object(text)?;

    let prediction: Outcome = obj.get("predictVanNhat")?.as_str()?.parse().ok()?;
    let confidence: ConfidenceTier = obj.get("confidence")?.as_str()?.parse().ok()?;
    let explanation = non_empty_str(&obj, "giai_thich")?;
    let deep_analysis = non_empty_str(&obj, "phan_tich_chuyen_sau")?;
    let risk_note = non_empty_str(&obj, "luu_y")?;

    let factors = obj.get("yeu_to_quyet_dinh")?.as_array()?;
    let decisive_factors = factors
        .iter()
        .map(|f| f.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()?;
    if decisive_factors.is_empty() {
        return None;
    }

    Some(EnrichedResult {
        prediction,
        confidence,
        explanation,
        deep_analysis,
        risk_note,
        decisive_factors,
        source: AdvisorySource::Live,
    })
}

fn non_empty_str(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Scorer-derived result used whenever the live path is unavailable.
pub fn fallback_advice(scored: &ScoredPrediction) -> EnrichedResult {
    EnrichedResult {
        prediction: scored.prediction,
        confidence: scored.tier(),
        explanation: format!("{FALLBACK_EXPLANATION_PREFIX}{}", scored.reasons.join(" ")),
        deep_analysis: FALLBACK_DEEP_ANALYSIS.to_string(),
        risk_note: FALLBACK_RISK_NOTE.to_string(),
        decisive_factors: scored.reasons.clone(),
        source: AdvisorySource::Fallback,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
