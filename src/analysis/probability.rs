//! Transition-frequency model.
//!
//! Counts first-order transitions (previous outcome → next outcome) and
//! what happens right after two identical outcomes in a row.

use crate::types::{Outcome, ProbabilityModel};

/// Transition probability used when an outcome was never observed.
pub const DEFAULT_TRANSITION: f64 = 0.5;
/// Streak-break probability used when no streak was ever observed.
pub const DEFAULT_STREAK_BREAK: f64 = 0.3;

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    tai: u32,
    xiu: u32,
}

impl Counts {
    fn bump(&mut self, next: Outcome) {
        match next {
            Outcome::Tai => self.tai += 1,
            Outcome::Xiu => self.xiu += 1,
        }
    }

    fn ratios(&self) -> (f64, f64) {
        let n = self.tai + self.xiu;
        if n == 0 {
            (DEFAULT_TRANSITION, DEFAULT_TRANSITION)
        } else {
            (self.tai as f64 / n as f64, self.xiu as f64 / n as f64)
        }
    }
}

/// Build the transition model from `results` (the trailing window).
///
/// Pairs or triples involving an unrecognised outcome are skipped.
pub fn transition_model(results: &[Option<Outcome>]) -> ProbabilityModel {
    let mut after_tai = Counts::default();
    let mut after_xiu = Counts::default();
    let mut streak_continue = 0u32;
    let mut streak_break = 0u32;

    for i in 1..results.len() {
        let (Some(prev), Some(current)) = (results[i - 1], results[i]) else {
            continue;
        };

        match prev {
            Outcome::Tai => after_tai.bump(current),
            Outcome::Xiu => after_xiu.bump(current),
        }

        if i >= 2 && results[i - 2] == Some(prev) {
            if current == prev {
                streak_continue += 1;
            } else {
                streak_break += 1;
            }
        }
    }

    let (after_tai_tai, after_tai_xiu) = after_tai.ratios();
    let (after_xiu_tai, after_xiu_xiu) = after_xiu.ratios();
    let streak_total = streak_continue + streak_break;

    ProbabilityModel {
        after_tai_tai,
        after_tai_xiu,
        after_xiu_tai,
        after_xiu_xiu,
        streak_break: if streak_total > 0 {
            streak_break as f64 / streak_total as f64
        } else {
            DEFAULT_STREAK_BREAK
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Option<Outcome> = Some(Outcome::Tai);
    const X: Option<Outcome> = Some(Outcome::Xiu);

    #[test]
    fn test_defaults_without_tai() {
        let model = transition_model(&[X, X, X, X, X]);
        assert_eq!(model.after_tai_tai, 0.5);
        assert_eq!(model.after_tai_xiu, 0.5);
        assert_eq!(model.after_xiu_xiu, 1.0);
        assert_eq!(model.after_xiu_tai, 0.0);
    }

    #[test]
    fn test_default_streak_break_without_streaks() {
        let model = transition_model(&[T, X, T, X, T, X]);
        assert_eq!(model.streak_break, 0.3);
        assert_eq!(model.after_tai_xiu, 1.0);
        assert_eq!(model.after_xiu_tai, 1.0);
    }

    #[test]
    fn test_empty_and_single() {
        for results in [&[][..], &[T][..]] {
            let model = transition_model(results);
            assert_eq!(model.after_tai_tai, 0.5);
            assert_eq!(model.after_tai_xiu, 0.5);
            assert_eq!(model.after_xiu_tai, 0.5);
            assert_eq!(model.after_xiu_xiu, 0.5);
            assert_eq!(model.streak_break, 0.3);
        }
    }

    #[test]
    fn test_transition_counts() {
        // pairs: TT, TX, XX, XT, TT → after T: tai 2, xiu 1; after X: tai 1, xiu 1
        let model = transition_model(&[T, T, X, X, T, T]);
        assert!((model.after_tai_tai - 2.0 / 3.0).abs() < 1e-12);
        assert!((model.after_tai_xiu - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.after_xiu_tai, 0.5);
        assert_eq!(model.after_xiu_xiu, 0.5);
        // triples after a pair: (T,T,X) break, (X,X,T) break
        assert_eq!(model.streak_break, 1.0);
    }

    #[test]
    fn test_streak_continue_and_break() {
        // (T,T,T) continue, (T,T,X) break
        let model = transition_model(&[T, T, T, X]);
        assert_eq!(model.streak_break, 0.5);
    }

    #[test]
    fn test_transition_pairs_sum_to_one() {
        let model = transition_model(&[T, X, X, T, T, T, X, T, X, X, X, T]);
        assert!((model.after_tai_tai + model.after_tai_xiu - 1.0).abs() < 1e-12);
        assert!((model.after_xiu_tai + model.after_xiu_xiu - 1.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&model.streak_break));
    }

    #[test]
    fn test_unknown_outcomes_skipped() {
        let model = transition_model(&[T, None, T, T]);
        // Only the final (T,T) pair counts; (None,T,T) is not a streak.
        assert_eq!(model.after_tai_tai, 1.0);
        assert_eq!(model.streak_break, 0.3);
    }
}
