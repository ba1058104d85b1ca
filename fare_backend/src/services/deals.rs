//! Read-side queries over scored observations: ranked deals, per-route
//! summaries, model accuracy and per-record drop estimates.

use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::algorithms::drop_probability::{estimate_with_model, DropEstimate, RecordDropModel};
use crate::algorithms::holt_winters::{SimpleSmoothing, SimpleSmoothingConfig};
use crate::db::repository::ObservationRepository;
use crate::models::{ObservationId, ObservationKind, PriceObservation, ScoredObservation};

/// Number of most recent observations summarised by [`route_analytics`].
pub const ROUTE_WINDOW: usize = 90;

/// Observations per half of the trend comparison.
const TREND_SPAN: usize = 7;

/// Relative change needed before a trend is called.
const TREND_BAND: f64 = 0.05;

/// `delta_pct` above which an observation counts as a deal.
const DEAL_DELTA: f64 = 0.1;

// ==================== Top deals ====================

/// Filters for [`top_deals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDealsQuery {
    pub kind: ObservationKind,
    pub limit: usize,
    /// Minimum `delta_pct`.
    pub min_savings: Option<f64>,
    /// Maximum rarity (lower = rarer).
    pub max_rarity: Option<f64>,
}

impl Default for TopDealsQuery {
    fn default() -> Self {
        Self {
            kind: ObservationKind::Flight,
            limit: 20,
            min_savings: None,
            max_rarity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub observation: PriceObservation,
    /// `max(0, 0.7 * delta_pct + 0.3 * (1 - rarity))`.
    pub deal_score: f64,
    /// `max(0, expected - price)`.
    pub savings: f64,
}

/// Rank scored observations of one kind by deal score, best first.
pub async fn top_deals<R: ObservationRepository + ?Sized>(
    repo: &R,
    query: &TopDealsQuery,
) -> ServiceResult<Vec<Deal>> {
    let observations = repo
        .list_observations(query.kind, None)
        .await
        .map_err(|e| e.with_operation("top_deals"))?;

    let mut deals: Vec<Deal> = observations
        .into_iter()
        .filter(|obs| obs.has_valid_price())
        .filter_map(|obs| {
            let a = obs.analytics()?;
            if query.min_savings.is_some_and(|min| a.delta_pct < min) {
                return None;
            }
            if query.max_rarity.is_some_and(|max| a.rarity > max) {
                return None;
            }
            let deal_score = (0.7 * a.delta_pct + 0.3 * (1.0 - a.rarity)).max(0.0);
            let savings = (a.expected_price - obs.price()).max(0.0);
            Some(Deal {
                observation: obs,
                deal_score,
                savings,
            })
        })
        .collect();

    deals.sort_by(|a, b| {
        b.deal_score
            .partial_cmp(&a.deal_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    deals.truncate(query.limit);

    info!(
        "Service layer: returning {} {} deals",
        deals.len(),
        query.kind
    );
    Ok(deals)
}

// ==================== Route analytics ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Increasing,
    Decreasing,
    Stable,
    /// Not enough observations to compare two windows.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAnalytics {
    pub kind: ObservationKind,
    pub key: String,
    pub total_observations: usize,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Mean expected price over the scored observations.
    pub avg_expected: f64,
    /// Mean `delta_pct` (unscored observations count as 0).
    pub avg_delta_pct: f64,
    pub deals: usize,
    pub trend: PriceTrend,
    /// Single-exponential-smoothing level of the prices, oldest to newest.
    pub smoothed_price: Option<f64>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Compare the mean of the newest prices with the mean of the ones before.
///
/// `newest_first` must be ordered newest to oldest.
pub fn price_trend(newest_first: &[f64]) -> PriceTrend {
    if newest_first.len() <= TREND_SPAN {
        return PriceTrend::Unknown;
    }
    let recent = mean(&newest_first[..TREND_SPAN]);
    let older_end = (2 * TREND_SPAN).min(newest_first.len());
    let older = mean(&newest_first[TREND_SPAN..older_end]);

    if recent > older * (1.0 + TREND_BAND) {
        PriceTrend::Increasing
    } else if recent < older * (1.0 - TREND_BAND) {
        PriceTrend::Decreasing
    } else {
        PriceTrend::Stable
    }
}

/// Summarise the latest [`ROUTE_WINDOW`] observations of one route or region.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `kind` - Flights or hotels
/// * `key` - Series key (`"ORIGIN-DEST"` or region)
/// * `smoothing` - Smoothing weight for the smoothed price
pub async fn route_analytics<R: ObservationRepository + ?Sized>(
    repo: &R,
    kind: ObservationKind,
    key: &str,
    smoothing: &SimpleSmoothingConfig,
) -> ServiceResult<RouteAnalytics> {
    let smoother =
        SimpleSmoothing::new(*smoothing).map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;

    let mut observations: Vec<PriceObservation> = repo
        .list_observations(kind, None)
        .await
        .map_err(|e| e.with_operation("route_analytics"))?
        .into_iter()
        .filter(|obs| obs.series_key() == key)
        .collect();
    observations.sort_by_key(|obs| std::cmp::Reverse(obs.captured_at()));
    observations.truncate(ROUTE_WINDOW);

    let prices: Vec<f64> = observations
        .iter()
        .filter(|obs| obs.has_valid_price())
        .map(|obs| obs.price())
        .collect();
    let expected: Vec<f64> = observations
        .iter()
        .filter_map(|obs| obs.analytics())
        .map(|a| a.expected_price)
        .filter(|p| *p > 0.0)
        .collect();
    let deltas: Vec<f64> = observations
        .iter()
        .map(|obs| obs.analytics().map_or(0.0, |a| a.delta_pct))
        .collect();
    let deals = observations
        .iter()
        .filter(|obs| obs.analytics().is_some_and(|a| a.delta_pct > DEAL_DELTA))
        .count();

    let chronological: Vec<f64> = prices.iter().rev().copied().collect();

    Ok(RouteAnalytics {
        kind,
        key: key.to_string(),
        total_observations: observations.len(),
        avg_price: mean(&prices),
        min_price: prices.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max_price: prices.iter().copied().reduce(f64::max).unwrap_or(0.0),
        avg_expected: mean(&expected),
        avg_delta_pct: mean(&deltas),
        deals,
        trend: price_trend(&prices),
        smoothed_price: smoother.level(&chronological),
    })
}

// ==================== Model performance ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    /// Scored observations considered.
    pub total_predictions: usize,
    /// Observations whose absolute error is below their expected price.
    pub samples_analyzed: usize,
    /// Mean absolute percentage error over the analysed samples.
    pub mape: f64,
    /// `clamp((1 - mape) * 100, 0, 100)`.
    pub accuracy_pct: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Accuracy of the stored baselines against the observed prices.
pub async fn model_performance<R: ObservationRepository + ?Sized>(
    repo: &R,
) -> ServiceResult<ModelPerformance> {
    let mut scored = Vec::new();
    for kind in [ObservationKind::Flight, ObservationKind::Hotel] {
        let observations = repo
            .list_observations(kind, None)
            .await
            .map_err(|e| e.with_operation("model_performance"))?;
        scored.extend(
            observations
                .into_iter()
                .filter(|obs| obs.analytics().is_some()),
        );
    }

    let last_updated = scored
        .iter()
        .filter_map(|obs| obs.analytics().map(|a| a.model_updated_at))
        .max();

    let errors: Vec<f64> = scored
        .iter()
        .filter_map(|obs| {
            let expected = obs.analytics()?.expected_price;
            let error = (obs.price() - expected).abs();
            (expected > 0.0 && obs.has_valid_price() && error < expected)
                .then(|| error / expected)
        })
        .collect();

    let mape = mean(&errors);
    let accuracy_pct = if errors.is_empty() {
        0.0
    } else {
        ((1.0 - mape) * 100.0).clamp(0.0, 100.0)
    };

    Ok(ModelPerformance {
        total_predictions: scored.len(),
        samples_analyzed: errors.len(),
        mape,
        accuracy_pct,
        last_updated,
    })
}

// ==================== Drop estimate ====================

/// Look up an observation and estimate whether its price will fall further.
///
/// # Returns
/// * `Ok(DropEstimate)` - Estimate as of `today`
/// * `Err(ServiceError::Repository)` - `NotFound` if the observation doesn't exist
pub async fn estimate_drop_for<R: ObservationRepository + ?Sized>(
    repo: &R,
    id: ObservationId,
    today: NaiveDate,
) -> ServiceResult<DropEstimate> {
    let observation = repo
        .get_observation(id)
        .await
        .map_err(|e| e.with_operation("estimate_drop_for"))?;
    Ok(estimate_with_model(
        &RecordDropModel::default(),
        &observation,
        today,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::RepositoryError;
    use crate::models::{AnalyticFields, FlightObservation, HotelObservation};
    use chrono::TimeZone;

    fn fields(expected_price: f64, delta_pct: f64, rarity: f64) -> AnalyticFields {
        AnalyticFields {
            expected_price,
            delta_pct,
            z_score: 0.0,
            rarity,
            is_anomaly: false,
            model_updated_at: Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
        }
    }

    fn flight(dest: &str, hour: u32, price: f64, analytics: Option<AnalyticFields>) -> PriceObservation {
        FlightObservation {
            id: ObservationId::new(0),
            origin: "JFK".to_string(),
            dest: dest.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            price,
            captured_at: Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
            analytics,
        }
        .into()
    }

    #[test]
    fn test_price_trend() {
        let rising: Vec<f64> = [vec![110.0; 7], vec![100.0; 7]].concat();
        assert_eq!(price_trend(&rising), PriceTrend::Increasing);

        let falling: Vec<f64> = [vec![90.0; 7], vec![100.0; 3]].concat();
        assert_eq!(price_trend(&falling), PriceTrend::Decreasing);

        let flat: Vec<f64> = [vec![103.0; 7], vec![100.0; 7]].concat();
        assert_eq!(price_trend(&flat), PriceTrend::Stable);

        assert_eq!(price_trend(&[100.0; 7]), PriceTrend::Unknown);
    }

    #[tokio::test]
    async fn test_top_deals_ranking_and_filters() {
        let repo = LocalRepository::new();
        repo.store_observations_impl(vec![
            flight("MCO", 1, 80.0, Some(fields(100.0, 0.2, 0.1))),
            flight("MIA", 2, 95.0, Some(fields(100.0, 0.05, 0.5))),
            flight("TPA", 3, 150.0, Some(fields(100.0, -0.5, 1.0))),
            flight("FLL", 4, 70.0, None),
        ]);

        let deals = top_deals(&repo, &TopDealsQuery::default()).await.unwrap();
        assert_eq!(deals.len(), 3);
        assert_eq!(deals[0].observation.series_key(), "JFK-MCO");
        assert!((deals[0].deal_score - (0.7 * 0.2 + 0.3 * 0.9)).abs() < 1e-12);
        assert_eq!(deals[0].savings, 20.0);
        assert_eq!(deals[2].deal_score, 0.0);
        assert_eq!(deals[2].savings, 0.0);

        let filtered = top_deals(
            &repo,
            &TopDealsQuery {
                min_savings: Some(0.1),
                max_rarity: Some(0.2),
                limit: 5,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);

        let limited = top_deals(
            &repo,
            &TopDealsQuery {
                limit: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_route_analytics_summary() {
        let repo = LocalRepository::new();
        repo.store_observations_impl(vec![
            flight("MCO", 1, 100.0, Some(fields(110.0, 0.0909, 0.5))),
            flight("MCO", 2, 120.0, Some(fields(110.0, -0.0909, 0.9))),
            flight("MCO", 3, 80.0, Some(fields(100.0, 0.2, 0.1))),
            flight("MIA", 4, 500.0, None),
        ]);

        let summary = route_analytics(
            &repo,
            ObservationKind::Flight,
            "JFK-MCO",
            &SimpleSmoothingConfig { alpha: 0.5 },
        )
        .await
        .unwrap();

        assert_eq!(summary.total_observations, 3);
        assert_eq!(summary.avg_price, 100.0);
        assert_eq!(summary.min_price, 80.0);
        assert_eq!(summary.max_price, 120.0);
        assert!((summary.avg_expected - 320.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.deals, 1);
        assert_eq!(summary.trend, PriceTrend::Unknown);
        // chronological 100, 120, 80 -> 100, 110, 95
        assert_eq!(summary.smoothed_price, Some(95.0));
    }

    #[tokio::test]
    async fn test_route_analytics_empty_route() {
        let repo = LocalRepository::new();
        let summary = route_analytics(
            &repo,
            ObservationKind::Hotel,
            "ORL",
            &SimpleSmoothingConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(summary.total_observations, 0);
        assert_eq!(summary.avg_price, 0.0);
        assert_eq!(summary.smoothed_price, None);
    }

    #[tokio::test]
    async fn test_model_performance() {
        let repo = LocalRepository::new();
        repo.store_observations_impl(vec![
            flight("MCO", 1, 90.0, Some(fields(100.0, 0.1, 0.5))),
            flight("MCO", 2, 110.0, Some(fields(100.0, -0.1, 0.5))),
            // Error larger than the expected price is left out of the MAPE.
            flight("MCO", 3, 250.0, Some(fields(100.0, -1.5, 1.0))),
            flight("MCO", 4, 100.0, None),
        ]);
        repo.store_observation_impl(
            HotelObservation {
                id: ObservationId::new(0),
                region: "ORL".to_string(),
                check_in: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2025, 2, 4).unwrap(),
                nightly_price: 160.0,
                captured_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                analytics: Some(AnalyticFields {
                    model_updated_at: Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
                    ..fields(200.0, 0.2, 0.3)
                }),
            }
            .into(),
        );

        let perf = model_performance(&repo).await.unwrap();
        assert_eq!(perf.total_predictions, 4);
        assert_eq!(perf.samples_analyzed, 3);
        assert!((perf.mape - 0.4 / 3.0).abs() < 1e-12);
        assert!((perf.accuracy_pct - (1.0 - 0.4 / 3.0) * 100.0).abs() < 1e-9);
        assert_eq!(
            perf.last_updated,
            Some(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_estimate_drop_for_missing_observation() {
        let repo = LocalRepository::new();
        let id = repo.store_observation_impl(flight("MCO", 1, 80.0, Some(fields(100.0, 0.2, 0.1))));
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let estimate = estimate_drop_for(&repo, id, today).await.unwrap();
        assert_eq!(estimate.factors.days_out, 31);

        let err = estimate_drop_for(&repo, ObservationId::new(404), today)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::NotFound { .. })
        ));
    }
}
