//! Mock sources for integration testing.
//!
//! Deterministic `HistorySource` and `TextGenerator` implementations whose
//! data, failures and call counts are controllable from test code. All
//! in-memory with no external dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use taixiu_predictor::history::HistorySource;
use taixiu_predictor::llm::TextGenerator;
use taixiu_predictor::types::{Outcome, OutcomeRecord, OutcomeSequence};

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockHistory {
    records: Arc<Mutex<OutcomeSequence>>,
    /// If set, every fetch fails with this message.
    force_error: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl MockHistory {
    pub fn new(records: OutcomeSequence) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    pub fn set_records(&self, records: OutcomeSequence) {
        *self.records.lock().unwrap() = records;
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistorySource for MockHistory {
    async fn fetch_history(&self) -> Result<OutcomeSequence> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock-history"
    }
}

// ---------------------------------------------------------------------------
// Text generator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockGenerator {
    reply: Arc<Mutex<Result<String, String>>>,
    calls: Arc<AtomicUsize>,
}

impl MockGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Arc::new(Mutex::new(Ok(text.to_string()))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            reply: Arc::new(Mutex::new(Err(msg.to_string()))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Build a history from a compact pattern such as `"TTXTX"`, with totals
/// consistent with each label.
pub fn history_from_pattern(pattern: &str, first_session: u64) -> OutcomeSequence {
    pattern
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let session = first_session + i as u64;
            match c {
                'T' => OutcomeRecord::new(session, Outcome::Tai, 12),
                _ => OutcomeRecord::new(session, Outcome::Xiu, 8),
            }
        })
        .collect()
}

pub const VALID_ADVICE: &str = r#"Kết quả phân tích:
{
    "predictVanNhat": "XỈU",
    "confidence": "cao",
    "giai_thich": "Chuỗi Tài kéo dài, xác suất đảo chiều tăng.",
    "phan_tich_chuyen_sau": "Ma trận chuyển tiếp nghiêng về Xỉu.",
    "luu_y": "Chỉ mang tính tham khảo.",
    "yeu_to_quyet_dinh": ["Chuỗi dài", "Xác suất chuyển tiếp"]
}"#;
