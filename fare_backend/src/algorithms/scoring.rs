//! Robust deviation scores and empirical rarity.

use serde::{Deserialize, Serialize};

/// Scale factor that makes the MAD a consistent estimator of σ under normality.
pub const MAD_SCALE: f64 = 1.4826;

/// `|z|` above which an observation is flagged as anomalous.
pub const ANOMALY_THRESHOLD: f64 = 2.0;

/// Rarity reported when there is no history to compare against.
pub const NEUTRAL_RARITY: f64 = 0.5;

/// Deviation of one observation from its expected price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub z_score: f64,
    pub delta_pct: f64,
    pub is_anomaly: bool,
}

/// Upper median: the element at `len / 2` of the sorted values.
fn upper_median(sorted: &[f64]) -> Option<f64> {
    sorted.get(sorted.len() / 2).copied()
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Robust standard deviation: `MAD_SCALE * median(|r - median(r)|)`.
///
/// Returns 0 for an empty slice.
pub fn robust_std(residuals: &[f64]) -> f64 {
    let sorted = sorted_copy(residuals);
    let Some(center) = upper_median(&sorted) else {
        return 0.0;
    };
    let deviations: Vec<f64> = sorted.iter().map(|r| (r - center).abs()).collect();
    let deviations = sorted_copy(&deviations);
    upper_median(&deviations).unwrap_or(0.0) * MAD_SCALE
}

/// Score `actual` against `expected` using the residual history for scale.
///
/// A zero robust deviation yields `z_score = 0` (never anomalous), and a zero
/// expected price yields `delta_pct = 0`.
pub fn score(actual: f64, expected: f64, residuals: &[f64]) -> AnomalyScore {
    score_with_threshold(actual, expected, residuals, ANOMALY_THRESHOLD)
}

/// [`score`] with a custom anomaly threshold.
pub fn score_with_threshold(
    actual: f64,
    expected: f64,
    residuals: &[f64],
    threshold: f64,
) -> AnomalyScore {
    let delta_pct = if expected != 0.0 {
        (expected - actual) / expected
    } else {
        0.0
    };

    let scale = robust_std(residuals);
    let z_score = if scale > 0.0 {
        (actual - expected) / scale
    } else {
        0.0
    };

    AnomalyScore {
        z_score,
        delta_pct,
        is_anomaly: z_score.abs() > threshold,
    }
}

/// Fraction of `history` at or below `current`; 0.5 for an empty history.
///
/// Lower values mean the price is cheaper than almost everything seen.
pub fn rarity(current: f64, history: &[f64]) -> f64 {
    if history.is_empty() {
        return NEUTRAL_RARITY;
    }
    let at_or_below = history.iter().filter(|&&p| p <= current).count();
    at_or_below as f64 / history.len() as f64
}
