//! Logistic price-drop models.
//!
//! Two independent models live here:
//!
//! * [`RecordDropModel`] answers "will this single fare fall further?" and
//!   carries a confidence level and a book/wait recommendation.
//! * [`PackageDropModel`] is the lighter score stored on assembled packages.
//!
//! Both use fixed coefficients; nothing here is trained.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::ScoredObservation;

/// Days-out value used when an observation has no travel date.
pub const DEFAULT_DAYS_OUT: i64 = 30;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Whole days from `today` until `travel_date`, floored at zero.
pub fn days_out(travel_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match travel_date {
        Some(date) => (date - today).num_days().max(0),
        None => DEFAULT_DAYS_OUT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Book,
    Wait,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Book => f.write_str("book"),
            Recommendation::Wait => f.write_str("wait"),
        }
    }
}

/// Inputs of the record model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropFactors {
    pub delta_pct: f64,
    pub z_score: f64,
    pub rarity: f64,
    pub days_out: i64,
}

impl DropFactors {
    /// Factors for an unscored observation: no savings, no anomaly, median rarity.
    pub fn neutral(days_out: i64) -> Self {
        Self {
            delta_pct: 0.0,
            z_score: 0.0,
            rarity: 0.5,
            days_out,
        }
    }
}

/// Human-facing summary of the factors behind an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorReport {
    /// `delta_pct` as a whole percentage.
    pub current_savings_pct: i64,
    pub days_out: i64,
    /// `(1 - rarity)` as a whole percentage.
    pub rarity_percentile: i64,
    /// `|z_score|` to one decimal place.
    pub anomaly_score: f64,
}

impl From<&DropFactors> for FactorReport {
    fn from(f: &DropFactors) -> Self {
        Self {
            current_savings_pct: (f.delta_pct * 100.0).round() as i64,
            days_out: f.days_out,
            rarity_percentile: ((1.0 - f.rarity) * 100.0).round() as i64,
            anomaly_score: (f.z_score.abs() * 10.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEstimate {
    pub probability: f64,
    pub confidence: Confidence,
    pub recommendation: Recommendation,
    pub factors: FactorReport,
}

/// Per-record drop model with confidence and recommendation rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordDropModel {
    pub intercept: f64,
    pub delta_pct_coeff: f64,
    pub days_out_coeff: f64,
    /// Applied to `(1 - rarity)`.
    pub rarity_coeff: f64,
    /// Applied to `|z_score|`.
    pub z_score_coeff: f64,
}

impl Default for RecordDropModel {
    fn default() -> Self {
        Self {
            intercept: 0.2,
            delta_pct_coeff: -2.0,
            days_out_coeff: 0.02,
            rarity_coeff: -1.0,
            z_score_coeff: -0.1,
        }
    }
}

impl RecordDropModel {
    pub fn probability(&self, f: &DropFactors) -> f64 {
        let logit = self.intercept
            + self.delta_pct_coeff * f.delta_pct
            + self.days_out_coeff * f.days_out as f64
            + self.rarity_coeff * (1.0 - f.rarity)
            + self.z_score_coeff * f.z_score.abs();
        sigmoid(logit)
    }

    /// Probability plus the rule-based confidence and recommendation.
    ///
    /// The first matching rule sets both fields; an extreme probability then
    /// overrides the recommendation (`p < 0.3` books, `p > 0.7` waits).
    pub fn estimate(&self, f: &DropFactors) -> DropEstimate {
        let probability = self.probability(f);

        let (confidence, mut recommendation) = if f.delta_pct > 0.2 || f.rarity < 0.2 {
            (Confidence::High, Recommendation::Book)
        } else if f.delta_pct < 0.05 && f.days_out > 14 {
            (Confidence::High, Recommendation::Wait)
        } else if f.z_score.abs() > 2.0 {
            let rec = if f.delta_pct > 0.1 {
                Recommendation::Book
            } else {
                Recommendation::Wait
            };
            (Confidence::High, rec)
        } else {
            (Confidence::Medium, Recommendation::Wait)
        };

        if probability < 0.3 {
            recommendation = Recommendation::Book;
        } else if probability > 0.7 {
            recommendation = Recommendation::Wait;
        }

        DropEstimate {
            probability,
            confidence,
            recommendation,
            factors: FactorReport::from(f),
        }
    }
}

/// Drop score attached to assembled packages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackageDropModel {
    pub delta_pct_coeff: f64,
    pub rarity_coeff: f64,
    pub pct_saved_coeff: f64,
}

impl Default for PackageDropModel {
    fn default() -> Self {
        Self {
            delta_pct_coeff: 2.0,
            rarity_coeff: -1.0,
            pct_saved_coeff: -0.5,
        }
    }
}

impl PackageDropModel {
    /// # Arguments
    /// * `delta_pct` - Flight deviation below its baseline
    /// * `rarity_score` - Mean of flight and hotel rarity
    /// * `pct_saved` - Package saving versus the expected bundle price
    pub fn probability(&self, delta_pct: f64, rarity_score: f64, pct_saved: f64) -> f64 {
        let x = self.delta_pct_coeff * delta_pct
            + self.rarity_coeff * rarity_score
            + self.pct_saved_coeff * pct_saved;
        sigmoid(x)
    }
}

/// Estimate the drop probability of a stored observation as of `today`.
///
/// Unscored observations fall back to [`DropFactors::neutral`].
pub fn estimate_drop_probability<O: ScoredObservation + ?Sized>(
    observation: &O,
    today: NaiveDate,
) -> DropEstimate {
    estimate_with_model(&RecordDropModel::default(), observation, today)
}

pub fn estimate_with_model<O: ScoredObservation + ?Sized>(
    model: &RecordDropModel,
    observation: &O,
    today: NaiveDate,
) -> DropEstimate {
    let days = days_out(Some(observation.travel_date()), today);
    let factors = match observation.analytics() {
        Some(a) => DropFactors {
            delta_pct: a.delta_pct,
            z_score: a.z_score,
            rarity: a.rarity,
            days_out: days,
        },
        None => DropFactors::neutral(days),
    };
    model.estimate(&factors)
}
