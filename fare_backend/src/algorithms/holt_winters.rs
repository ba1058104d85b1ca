//! Additive Holt-Winters (triple exponential smoothing) with grid-searched
//! smoothing weights, plus a single exponential smoothing model.
//!
//! # Recursion
//!
//! ```text
//! fitted[t] = L[t-1] + T[t-1] + S[t mod m]
//! L[t]      = α (y[t] - S[t mod m]) + (1 - α)(L[t-1] + T[t-1])
//! T[t]      = β (L[t] - L[t-1]) + (1 - β) T[t-1]
//! S[t mod m] = γ (y[t] - L[t]) + (1 - γ) S[t mod m]
//! ```
//!
//! Index 0 carries the initial state only: `fitted[0] = L[0] + S[0]`.
//!
//! # Initialisation
//!
//! Seasonal buckets are the mean of all observations sharing `i mod m`. The
//! initial cycle is the buckets centred on their grand mean (so it sums to
//! zero), the initial level is the mean of the deseasonalised first cycle and
//! the initial trend is the least-squares slope of `y[i] - bucket[i mod m]`
//! over the first `2m` points.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::{ModelError, ModelResult};

/// Weekly seasonality for daily price series.
pub const WEEKLY_PERIOD: usize = 7;

/// Smoothing weights for level (`alpha`), trend (`beta`) and season (`gamma`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl SmoothingParams {
    /// Weights used when no grid combination yields a usable fit.
    pub const FALLBACK: SmoothingParams = SmoothingParams {
        alpha: 0.3,
        beta: 0.1,
        gamma: 0.1,
    };

    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    fn validate(&self) -> ModelResult<()> {
        let in_range = |v: f64| v.is_finite() && v > 0.0 && v < 1.0;
        if in_range(self.alpha) && in_range(self.beta) && in_range(self.gamma) {
            Ok(())
        } else {
            Err(self.degenerate("weights must lie in (0, 1)"))
        }
    }

    fn degenerate(&self, reason: &str) -> ModelError {
        ModelError::DegenerateParameters {
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
            reason: reason.to_string(),
        }
    }
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Holt-Winters configuration: seasonal period, candidate grid and fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoltWintersConfig {
    pub seasonal_period: usize,
    pub alpha_grid: Vec<f64>,
    pub beta_grid: Vec<f64>,
    pub gamma_grid: Vec<f64>,
    pub fallback: SmoothingParams,
}

impl Default for HoltWintersConfig {
    fn default() -> Self {
        Self {
            seasonal_period: WEEKLY_PERIOD,
            alpha_grid: vec![0.1, 0.3, 0.5, 0.7],
            beta_grid: vec![0.05, 0.1, 0.2],
            gamma_grid: vec![0.05, 0.1, 0.2],
            fallback: SmoothingParams::FALLBACK,
        }
    }
}

/// Weights pinned by the caller; unpinned weights are searched over the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedParams {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

impl FixedParams {
    /// Pin all three weights (the grid collapses to one combination).
    pub fn all(params: SmoothingParams) -> Self {
        Self {
            alpha: Some(params.alpha),
            beta: Some(params.beta),
            gamma: Some(params.gamma),
        }
    }
}

/// A fitted additive Holt-Winters model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoltWintersModel {
    pub params: SmoothingParams,
    pub period: usize,
    /// Level per time step.
    pub level: Vec<f64>,
    /// Trend per time step.
    pub trend: Vec<f64>,
    /// Current seasonal profile, one entry per phase (`t mod period`).
    pub seasonal: Vec<f64>,
    /// One-step-ahead in-sample predictions.
    pub fitted: Vec<f64>,
    /// `y[t] - fitted[t]`.
    pub residuals: Vec<f64>,
    pub mae: f64,
    pub mse: f64,
}

impl HoltWintersModel {
    /// Number of fitted time steps.
    pub fn len(&self) -> usize {
        self.fitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fitted.is_empty()
    }

    /// Forecast `h` steps past the last observation.
    pub fn forecast(&self, h: usize) -> f64 {
        let last = self.len().saturating_sub(1);
        let level = self.level.get(last).copied().unwrap_or(0.0);
        let trend = self.trend.get(last).copied().unwrap_or(0.0);
        let season = if self.period == 0 {
            0.0
        } else {
            self.seasonal[(last + h) % self.period]
        };
        level + h as f64 * trend + season
    }
}

/// Parameter-independent starting state, computed once per series.
#[derive(Debug, Clone)]
struct InitialState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
}

impl InitialState {
    fn compute(y: &[f64], m: usize) -> Self {
        let n = y.len();

        let buckets: Vec<f64> = (0..m)
            .map(|phase| {
                let members: Vec<f64> = y.iter().skip(phase).step_by(m).copied().collect();
                if members.is_empty() {
                    0.0
                } else {
                    members.iter().sum::<f64>() / members.len() as f64
                }
            })
            .collect();
        let grand_mean = buckets.iter().sum::<f64>() / m as f64;

        let level = (0..m)
            .map(|i| y[i] - (buckets[i] - grand_mean))
            .sum::<f64>()
            / m as f64;

        let limit = (2 * m).min(n);
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
        for (i, value) in y.iter().enumerate().take(limit) {
            let x = (i + 1) as f64;
            let detrended = value - buckets[i % m];
            sum_x += x;
            sum_y += detrended;
            sum_xy += x * detrended;
            sum_x2 += x * x;
        }
        let count = limit as f64;
        let denominator = count * sum_x2 - sum_x * sum_x;
        let trend = if denominator != 0.0 {
            (count * sum_xy - sum_x * sum_y) / denominator
        } else {
            0.0
        };

        let seasonal = buckets.iter().map(|b| b - grand_mean).collect();

        Self {
            level,
            trend,
            seasonal,
        }
    }
}

/// Holt-Winters fitter bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct HoltWinters {
    config: HoltWintersConfig,
}

impl HoltWinters {
    pub fn new(config: HoltWintersConfig) -> Self {
        Self { config }
    }

    /// Default grid and fallback with a custom seasonal period.
    pub fn with_period(period: usize) -> Self {
        Self::new(HoltWintersConfig {
            seasonal_period: period,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &HoltWintersConfig {
        &self.config
    }

    /// Fit with all three weights searched over the grid.
    pub fn fit(&self, y: &[f64]) -> ModelResult<HoltWintersModel> {
        self.fit_with(y, FixedParams::default())
    }

    /// Fit with some weights pinned.
    ///
    /// Every candidate combination is run and the lowest in-sample MSE wins
    /// (first in grid order on ties). Degenerate combinations are skipped; if
    /// none survives, the fallback weights are fitted and returned as is.
    ///
    /// # Errors
    /// * `InvalidPeriod` when the period is zero
    /// * `InsufficientData` when `y.len() < 2 * period`
    pub fn fit_with(&self, y: &[f64], fixed: FixedParams) -> ModelResult<HoltWintersModel> {
        let m = self.config.seasonal_period;
        if m == 0 {
            return Err(ModelError::InvalidPeriod(m));
        }
        if y.len() < 2 * m {
            return Err(ModelError::InsufficientData {
                required: 2 * m,
                actual: y.len(),
                period: m,
            });
        }

        let initial = InitialState::compute(y, m);
        let candidates = |pinned: Option<f64>, grid: &[f64]| -> Vec<f64> {
            pinned.map_or_else(|| grid.to_vec(), |v| vec![v])
        };
        let alphas = candidates(fixed.alpha, &self.config.alpha_grid);
        let betas = candidates(fixed.beta, &self.config.beta_grid);
        let gammas = candidates(fixed.gamma, &self.config.gamma_grid);

        let mut best: Option<HoltWintersModel> = None;
        for &alpha in &alphas {
            for &beta in &betas {
                for &gamma in &gammas {
                    let params = SmoothingParams::new(alpha, beta, gamma);
                    match checked_recursion(y, m, &initial, params) {
                        Ok(model) => {
                            if best.as_ref().map_or(true, |b| model.mse < b.mse) {
                                best = Some(model);
                            }
                        }
                        Err(e) => debug!("Holt-Winters: skipping combination: {}", e),
                    }
                }
            }
        }

        Ok(best.unwrap_or_else(|| {
            warn!(
                "Holt-Winters: no usable grid combination for {} points, refitting with fallback {:?}",
                y.len(),
                self.config.fallback
            );
            recursion(y, m, &initial, self.config.fallback)
        }))
    }
}

/// Fit a price series with the default grid and the given seasonal period.
pub fn fit_series(prices: &[f64], period: usize) -> ModelResult<HoltWintersModel> {
    HoltWinters::with_period(period).fit(prices)
}

fn checked_recursion(
    y: &[f64],
    m: usize,
    initial: &InitialState,
    params: SmoothingParams,
) -> ModelResult<HoltWintersModel> {
    params.validate()?;
    let model = recursion(y, m, initial, params);
    if !model.mse.is_finite() || model.fitted.iter().any(|v| !v.is_finite()) {
        return Err(params.degenerate("non-finite fit"));
    }
    Ok(model)
}

fn recursion(
    y: &[f64],
    m: usize,
    initial: &InitialState,
    params: SmoothingParams,
) -> HoltWintersModel {
    let SmoothingParams { alpha, beta, gamma } = params;
    let n = y.len();

    let mut level = vec![0.0; n];
    let mut trend = vec![0.0; n];
    let mut fitted = vec![0.0; n];
    let mut residuals = vec![0.0; n];

    // Slots 0..m are the working cycle. First-cycle estimates (t < m) land one
    // cycle ahead and never feed the recursion.
    let mut season = vec![0.0; n.max(2 * m)];
    season[..m].copy_from_slice(&initial.seasonal);

    level[0] = initial.level;
    trend[0] = initial.trend;
    fitted[0] = level[0] + season[0];
    residuals[0] = y[0] - fitted[0];

    for t in 1..n {
        let phase = t % m;
        let prev_level = level[t - 1];
        let prev_trend = trend[t - 1];

        fitted[t] = prev_level + prev_trend + season[phase];
        level[t] = alpha * (y[t] - season[phase]) + (1.0 - alpha) * (prev_level + prev_trend);
        trend[t] = beta * (level[t] - prev_level) + (1.0 - beta) * prev_trend;

        let updated = gamma * (y[t] - level[t]) + (1.0 - gamma) * season[phase];
        let slot = if t < m { t + m } else { phase };
        season[slot] = updated;

        residuals[t] = y[t] - fitted[t];
    }

    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n as f64;
    let mse = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;

    season.truncate(m);
    HoltWintersModel {
        params,
        period: m,
        level,
        trend,
        seasonal: season,
        fitted,
        residuals,
        mae,
        mse,
    }
}

// ============================================================================
// Single Exponential Smoothing
// ============================================================================

/// Configuration for single exponential smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleSmoothingConfig {
    pub alpha: f64,
}

impl Default for SimpleSmoothingConfig {
    fn default() -> Self {
        Self { alpha: 0.3 }
    }
}

/// Single exponential smoothing: `S[t] = α y[t] + (1 - α) S[t-1]`, `S[0] = y[0]`.
#[derive(Debug, Clone, Copy)]
pub struct SimpleSmoothing {
    alpha: f64,
}

impl SimpleSmoothing {
    pub fn new(config: SimpleSmoothingConfig) -> ModelResult<Self> {
        if !(config.alpha > 0.0 && config.alpha < 1.0) {
            return Err(ModelError::InvalidParameter {
                name: "alpha".to_string(),
                reason: "must be between 0 and 1 (exclusive)".to_string(),
            });
        }
        Ok(Self {
            alpha: config.alpha,
        })
    }

    /// Smoothed series, same length as the input.
    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let mut smoothed = Vec::with_capacity(data.len());
        for &value in data {
            let next = match smoothed.last() {
                Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
                None => value,
            };
            smoothed.push(next);
        }
        smoothed
    }

    /// Final smoothed level, `None` for an empty series.
    pub fn level(&self, data: &[f64]) -> Option<f64> {
        self.smooth(data).last().copied()
    }
}
