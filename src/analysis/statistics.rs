//! Descriptive statistics over dice totals.

use std::collections::BTreeMap;

use crate::types::StatisticalSummary;

/// Smallest possible three-dice total.
pub const MIN_TOTAL: i64 = 3;
/// Largest possible three-dice total.
pub const MAX_TOTAL: i64 = 18;
/// Totals at or above this value are Tài; at or below `TAI_THRESHOLD - 1` are Xỉu.
pub const TAI_THRESHOLD: i64 = 11;

/// Mean, population standard deviation, range, category counts and a
/// histogram over `totals`.
///
/// The histogram always carries every key in 3..=18. Out-of-domain totals
/// still contribute to mean/min/max but not to the histogram.
pub fn summarize(totals: &[i64]) -> StatisticalSummary {
    let distribution = distribution(totals);

    if totals.is_empty() {
        return StatisticalSummary {
            mean: 0.0,
            min: 0,
            max: 0,
            std_dev: 0.0,
            variance: 0.0,
            distribution,
            tai_count: 0,
            xiu_count: 0,
            total_count: 0,
        };
    }

    let n = totals.len() as f64;
    let mean = totals.iter().map(|&t| t as f64).sum::<f64>() / n;
    let sum_sq: f64 = totals
        .iter()
        .map(|&t| {
            let diff = t as f64 - mean;
            diff * diff
        })
        .sum();
    let std_dev = (sum_sq / n).sqrt();

    StatisticalSummary {
        mean,
        min: totals.iter().copied().min().unwrap_or(0),
        max: totals.iter().copied().max().unwrap_or(0),
        std_dev,
        variance: std_dev * std_dev,
        distribution,
        tai_count: totals.iter().filter(|&&t| t >= TAI_THRESHOLD).count(),
        xiu_count: totals.iter().filter(|&&t| t < TAI_THRESHOLD).count(),
        total_count: totals.len(),
    }
}

fn distribution(totals: &[i64]) -> BTreeMap<i64, usize> {
    let mut dist: BTreeMap<i64, usize> = (MIN_TOTAL..=MAX_TOTAL).map(|k| (k, 0)).collect();
    for total in totals {
        if let Some(count) = dist.get_mut(total) {
            *count += 1;
        }
    }
    dist
}
