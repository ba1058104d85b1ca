//! Statistical models behind the baseline and deal engine.
//!
//! # Components
//!
//! - [`holt_winters`]: Additive Holt-Winters fitter with grid search, and single
//!   exponential smoothing
//! - [`scoring`]: Robust z-score, deviation and rarity of a price
//! - [`drop_probability`]: Logistic price-drop models for records and packages
//!
//! # Example
//!
//! ```ignore
//! use fare_backend::algorithms::{fit_series, score, WEEKLY_PERIOD};
//!
//! let model = fit_series(&prices, WEEKLY_PERIOD)?;
//! let last = prices.len() - 1;
//! let s = score(prices[last], model.fitted[last], &model.residuals);
//! println!("z = {:.2}, anomaly = {}", s.z_score, s.is_anomaly);
//! ```

pub mod drop_probability;
pub mod error;
pub mod holt_winters;
pub mod scoring;

pub use drop_probability::{
    days_out, estimate_drop_probability, Confidence, DropEstimate, DropFactors, FactorReport,
    PackageDropModel, Recommendation, RecordDropModel,
};
pub use error::{ModelError, ModelResult};
pub use holt_winters::{
    fit_series, FixedParams, HoltWinters, HoltWintersConfig, HoltWintersModel, SimpleSmoothing,
    SimpleSmoothingConfig, SmoothingParams, WEEKLY_PERIOD,
};
pub use scoring::{rarity, robust_std, score, AnomalyScore, ANOMALY_THRESHOLD};
