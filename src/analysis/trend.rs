//! Short-term trend detection.
//!
//! Majority vote over the most recent games: the outcome seen more often
//! wins, with strength equal to the normalised count difference.

use crate::types::{Outcome, Trend, TrendResult};

/// Compute the trend over `recent` (usually the trailing 10 games).
///
/// Records with no recognised outcome count towards the length but
/// towards neither side.
pub fn recent_trend(recent: &[Option<Outcome>]) -> TrendResult {
    if recent.is_empty() {
        return TrendResult {
            trend: Trend::Balanced,
            strength: 0.0,
            details: "Không có dữ liệu gần đây".to_string(),
        };
    }

    let len = recent.len();
    let tai = recent.iter().filter(|r| **r == Some(Outcome::Tai)).count();
    let xiu = recent.iter().filter(|r| **r == Some(Outcome::Xiu)).count();

    if tai > xiu {
        TrendResult {
            trend: Trend::Tai,
            strength: (tai - xiu) as f64 / len as f64,
            details: format!("Tài chiếm ưu thế {tai}/{len} lượt gần đây"),
        }
    } else if xiu > tai {
        TrendResult {
            trend: Trend::Xiu,
            strength: (xiu - tai) as f64 / len as f64,
            details: format!("Xỉu chiếm ưu thế {xiu}/{len} lượt gần đây"),
        }
    } else {
        TrendResult {
            trend: Trend::Balanced,
            strength: 0.0,
            details: "Tài Xỉu đang cân bằng".to_string(),
        }
    }
}
