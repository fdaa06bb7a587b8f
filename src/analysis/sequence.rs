//! Streak and alternation analysis.

use crate::types::{Outcome, SequenceAnalysis, StreakSegment};

/// Scan `results` left to right, tracking runs of identical outcomes.
///
/// Every run that ends (because the outcome changes) updates the maximum
/// for its outcome and is appended to `streak_history`. The final run is
/// still open, so it only updates the maxima and becomes the current
/// streak. An X,Y,X triple counts as one alternating pattern.
pub fn analyze_sequences(results: &[Option<Outcome>]) -> SequenceAnalysis {
    let mut analysis = SequenceAnalysis {
        current_streak: 0,
        current_type: None,
        max_tai_streak: 0,
        max_xiu_streak: 0,
        alternating_patterns: 0,
        streak_history: Vec::new(),
    };

    let Some(&first) = results.first() else {
        return analysis;
    };

    let mut run_len = 1usize;
    let mut run_kind = first;

    for i in 1..results.len() {
        if results[i] == results[i - 1] {
            run_len += 1;
        } else {
            close_run(&mut analysis, run_kind, run_len);
            analysis.streak_history.push(StreakSegment {
                kind: run_kind,
                length: run_len,
            });
            run_len = 1;
            run_kind = results[i];
        }

        if i >= 2 && results[i] != results[i - 1] && results[i - 1] != results[i - 2] {
            analysis.alternating_patterns += 1;
        }
    }

    close_run(&mut analysis, run_kind, run_len);
    analysis.current_streak = run_len;
    analysis.current_type = run_kind;

    analysis
}

fn close_run(analysis: &mut SequenceAnalysis, kind: Option<Outcome>, len: usize) {
    match kind {
        Some(Outcome::Tai) => analysis.max_tai_streak = analysis.max_tai_streak.max(len),
        Some(Outcome::Xiu) => analysis.max_xiu_streak = analysis.max_xiu_streak.max(len),
        None => {}
    }
}
