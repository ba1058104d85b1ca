//! Baseline refresh: series builder, Holt-Winters fit and scorer for every
//! route or region, with the derived fields written back to storage.
//!
//! Failures are isolated per group. A series that is too short keeps its
//! previous analytic fields; a series whose fit fails is logged with its key
//! and stage and the batch moves on. Only storage failures and a run in which
//! no group could be fitted at all are reported as errors.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use super::series::{build_series, Series};
use crate::algorithms::holt_winters::{HoltWinters, HoltWintersConfig};
use crate::algorithms::scoring::{rarity, score_with_threshold, ANOMALY_THRESHOLD};
use crate::db::repository::ObservationRepository;
use crate::models::{AnalyticFields, ObservationKind, PriceObservation, ScoredObservation};

/// Settings for the baseline refresh (`[model]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub holt_winters: HoltWintersConfig,
    /// `|z|` above which an observation is flagged.
    pub anomaly_threshold: f64,
    /// Only observations captured within this many days are refit. `None`
    /// refits the whole history.
    pub history_days: Option<i64>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            holt_winters: HoltWintersConfig::default(),
            anomaly_threshold: ANOMALY_THRESHOLD,
            history_days: None,
        }
    }
}

impl BaselineConfig {
    /// Minimum number of valid points a series needs to be fitted.
    pub fn min_series_len(&self) -> usize {
        2 * self.holt_winters.seasonal_period
    }
}

/// Outcome of one baseline refresh for one observation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub kind: ObservationKind,
    pub groups_processed: usize,
    pub groups_skipped: usize,
    pub groups_failed: usize,
    pub records_updated: usize,
    pub run_at: DateTime<Utc>,
}

impl RefreshSummary {
    fn empty(kind: ObservationKind, run_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            groups_processed: 0,
            groups_skipped: 0,
            groups_failed: 0,
            records_updated: 0,
            run_at,
        }
    }
}

/// Outcome of a flights-then-hotels refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRefreshSummary {
    pub flights: RefreshSummary,
    pub hotels: RefreshSummary,
    pub total_records: usize,
    pub total_groups: usize,
    pub completed_at: DateTime<Utc>,
}

/// Refresh the analytic fields of every observation of `kind`.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `kind` - Flights or hotels
/// * `config` - Fitter, threshold and history window
///
/// # Returns
/// * `Ok(RefreshSummary)` - Counts of processed, skipped and failed groups
/// * `Err(ServiceError::NoValidGroups)` - If no group could be fitted
/// * `Err(ServiceError::Repository)` - If listing or patching fails
pub async fn refresh_baselines<R: ObservationRepository + ?Sized>(
    repo: &R,
    kind: ObservationKind,
    config: &BaselineConfig,
) -> ServiceResult<RefreshSummary> {
    refresh_baselines_at(repo, kind, config, Utc::now()).await
}

/// [`refresh_baselines`] with an explicit run timestamp.
///
/// `now` is written as `model_updated_at` and anchors the history window.
pub async fn refresh_baselines_at<R: ObservationRepository + ?Sized>(
    repo: &R,
    kind: ObservationKind,
    config: &BaselineConfig,
    now: DateTime<Utc>,
) -> ServiceResult<RefreshSummary> {
    let since = config.history_days.map(|days| now - Duration::days(days));
    info!(
        "Service layer: refreshing {} baselines (period {}, since {:?})",
        kind, config.holt_winters.seasonal_period, since
    );

    let observations = repo
        .list_observations(kind, since)
        .await
        .map_err(|e| e.with_operation("refresh_baselines:list"))?;

    let set = build_series(observations, config.min_series_len());
    let mut summary = RefreshSummary::empty(kind, now);
    summary.groups_skipped = set.skipped.len();

    if set.invalid_prices > 0 {
        info!(
            "Service layer: ignored {} {} observations with invalid prices",
            set.invalid_prices, kind
        );
    }
    for skipped in &set.skipped {
        info!(
            "Service layer: skipping {} series '{}' ({} points, need {})",
            kind, skipped.key, skipped.len, skipped.required
        );
    }

    let fitter = HoltWinters::new(config.holt_winters.clone());
    for series in &set.series {
        let fields = match score_series(&fitter, series, config.anomaly_threshold, now) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(
                    "Service layer: {} series '{}' failed at stage fit: {}",
                    kind, series.key, e
                );
                summary.groups_failed += 1;
                continue;
            }
        };

        for (observation, fields) in series.observations.iter().zip(&fields) {
            repo.patch_observation(observation.id(), fields)
                .await
                .map_err(|e| e.with_operation("refresh_baselines:patch"))?;
            summary.records_updated += 1;
        }
        summary.groups_processed += 1;
    }

    if summary.groups_processed == 0 {
        warn!(
            "Service layer: no valid {} series ({} skipped, {} failed)",
            kind, summary.groups_skipped, summary.groups_failed
        );
        return Err(ServiceError::NoValidGroups {
            kind,
            skipped: summary.groups_skipped,
            failed: summary.groups_failed,
        });
    }

    info!(
        "Service layer: {} baselines refreshed: {} groups, {} records ({} skipped, {} failed)",
        kind,
        summary.groups_processed,
        summary.records_updated,
        summary.groups_skipped,
        summary.groups_failed
    );
    Ok(summary)
}

/// Fit one series and derive the analytic fields of each of its points.
///
/// Every point is scored against the same fit, with the full residual array
/// as scale and the full price array as rarity history.
fn score_series(
    fitter: &HoltWinters,
    series: &Series<PriceObservation>,
    threshold: f64,
    now: DateTime<Utc>,
) -> Result<Vec<AnalyticFields>, crate::algorithms::ModelError> {
    let prices = series.prices();
    let model = fitter.fit(&prices)?;

    Ok(prices
        .iter()
        .zip(&model.fitted)
        .map(|(&price, &fitted)| {
            let s = score_with_threshold(price, fitted, &model.residuals, threshold);
            AnalyticFields {
                expected_price: fitted.round(),
                delta_pct: s.delta_pct,
                z_score: s.z_score,
                rarity: rarity(price, &prices),
                is_anomaly: s.is_anomaly,
                model_updated_at: now,
            }
        })
        .collect())
}

/// Refresh flights, then hotels.
///
/// A kind without any valid series is logged and reported with zero counts;
/// the combined run only fails if both kinds have nothing to fit or the
/// store fails.
pub async fn refresh_all_baselines<R: ObservationRepository + ?Sized>(
    repo: &R,
    config: &BaselineConfig,
) -> ServiceResult<CombinedRefreshSummary> {
    refresh_all_baselines_at(repo, config, Utc::now()).await
}

pub async fn refresh_all_baselines_at<R: ObservationRepository + ?Sized>(
    repo: &R,
    config: &BaselineConfig,
    now: DateTime<Utc>,
) -> ServiceResult<CombinedRefreshSummary> {
    info!("Service layer: starting combined baseline refresh");

    let mut empty_kinds = 0;
    let mut run = |result: ServiceResult<RefreshSummary>, kind: ObservationKind| match result {
        Ok(summary) => Ok(summary),
        Err(e) if e.is_no_valid_groups() => {
            warn!("Service layer: {} refresh produced nothing: {}", kind, e);
            empty_kinds += 1;
            Ok(RefreshSummary::empty(kind, now))
        }
        Err(e) => Err(e),
    };

    let flights = run(
        refresh_baselines_at(repo, ObservationKind::Flight, config, now).await,
        ObservationKind::Flight,
    )?;
    let hotels = run(
        refresh_baselines_at(repo, ObservationKind::Hotel, config, now).await,
        ObservationKind::Hotel,
    )?;

    if empty_kinds == 2 {
        return Err(ServiceError::NothingToRefresh);
    }

    let summary = CombinedRefreshSummary {
        total_records: flights.records_updated + hotels.records_updated,
        total_groups: flights.groups_processed + hotels.groups_processed,
        flights,
        hotels,
        completed_at: Utc::now(),
    };
    info!(
        "Service layer: combined refresh done: {} groups, {} records",
        summary.total_groups, summary.total_records
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "baselines_tests.rs"]
mod tests;
