//! Service layer for the batch jobs and read-side queries.
//!
//! Services are generic over the repository traits, so the same code runs
//! against the in-memory store in tests and against any other backend.
//!
//! - [`series`]: grouping observations into per-route / per-region series
//! - [`baselines`]: Holt-Winters refresh of the analytic fields
//! - [`packages`]: flight + hotel package assembly
//! - [`deals`]: ranked deals, route summaries, model accuracy, drop estimates

pub mod baselines;
pub mod deals;
pub mod error;
pub mod packages;
pub mod series;

pub use baselines::{
    refresh_all_baselines, refresh_all_baselines_at, refresh_baselines, refresh_baselines_at,
    BaselineConfig, CombinedRefreshSummary, RefreshSummary,
};
pub use deals::{
    estimate_drop_for, model_performance, route_analytics, top_deals, Deal, ModelPerformance,
    PriceTrend, RouteAnalytics, TopDealsQuery,
};
pub use error::{ServiceError, ServiceResult};
pub use packages::{
    assemble, build_packages, build_packages_at, deduplicate, PackageBuildSummary, PackageConfig,
    StayPolicy,
};
pub use series::{build_series, Series, SeriesSet, SkippedSeries};
