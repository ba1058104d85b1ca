//! Package assembly: scored flights joined with hotels in the destination
//! region on the departure date, priced, deduplicated, and written over the
//! previous package set.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::error::{ServiceError, ServiceResult};
use crate::algorithms::drop_probability::PackageDropModel;
use crate::db::repository::FullRepository;
use crate::models::{
    FlightObservation, HotelObservation, ObservationKind, PackageDraft, PackageKey,
    ScoredObservation,
};

/// Which stay lengths produce a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StayPolicy {
    /// Only these exact night counts.
    Allowed(Vec<u32>),
    /// Any stay in `1..=max`.
    MaxNights(u32),
}

impl StayPolicy {
    pub fn accepts(&self, nights: i64) -> bool {
        let Ok(nights) = u32::try_from(nights) else {
            return false;
        };
        match self {
            StayPolicy::Allowed(allowed) => allowed.contains(&nights),
            StayPolicy::MaxNights(max) => nights > 0 && nights <= *max,
        }
    }
}

impl Default for StayPolicy {
    fn default() -> Self {
        StayPolicy::MaxNights(14)
    }
}

fn default_dest_regions() -> BTreeMap<String, String> {
    [("MCO", "ORL"), ("FLL", "FLL"), ("MIA", "MIA"), ("TPA", "TPA")]
        .into_iter()
        .map(|(dest, region)| (dest.to_string(), region.to_string()))
        .collect()
}

/// Settings for the package build (`[packages]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Only observations captured within this many days are considered.
    pub window_days: i64,
    /// Multiplier on the nightly rate when estimating the expected hotel cost.
    pub hotel_markup: f64,
    /// Minimum flight `delta_pct` for a hot deal.
    pub hot_deal_min_delta: f64,
    /// Maximum flight rarity for a hot deal.
    pub hot_deal_max_rarity: f64,
    /// Rarity assumed for hotels that have not been scored.
    pub neutral_hotel_rarity: f64,
    pub stay_policy: StayPolicy,
    /// Flight destination airport to hotel region.
    pub dest_regions: BTreeMap<String, String>,
    pub drop_model: PackageDropModel,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            hotel_markup: 1.2,
            hot_deal_min_delta: 0.15,
            hot_deal_max_rarity: 0.1,
            neutral_hotel_rarity: 0.5,
            stay_policy: StayPolicy::default(),
            dest_regions: default_dest_regions(),
            drop_model: PackageDropModel::default(),
        }
    }
}

/// Outcome of one package build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageBuildSummary {
    /// Packages written in this run.
    pub created: usize,
    /// Compatible flight + hotel pairs before deduplication.
    pub candidates: usize,
    /// Packages from the previous run that were deleted.
    pub superseded: usize,
}

/// Price one flight + hotel pair.
///
/// The flight must carry analytic fields; the hotel stay must be positive.
pub fn price_package(
    flight: &FlightObservation,
    hotel: &HotelObservation,
    region: &str,
    config: &PackageConfig,
) -> Option<PackageDraft> {
    let analytics = flight.analytics.as_ref()?;
    let nights = u32::try_from(hotel.stay_nights()).ok().filter(|n| *n > 0)?;
    let nights_f = f64::from(nights);

    let hotel_total = hotel.nightly_price * nights_f;
    let total_price = flight.price + hotel_total;
    let expected_total =
        analytics.expected_price + hotel.nightly_price * config.hotel_markup * nights_f;
    let pct_saved = if expected_total > 0.0 {
        ((expected_total - total_price) / expected_total).max(0.0)
    } else {
        0.0
    };

    let hotel_rarity = hotel
        .analytics
        .as_ref()
        .map_or(config.neutral_hotel_rarity, |a| a.rarity);
    let rarity_score = (analytics.rarity + hotel_rarity) / 2.0;

    Some(PackageDraft {
        origin: flight.origin.clone(),
        dest: flight.dest.clone(),
        region: region.to_string(),
        depart_date: flight.date,
        return_date: hotel.check_out,
        stay_nights: nights,
        flight_price: flight.price,
        hotel_total,
        total_price,
        pct_saved,
        rarity_score,
        drop_probability: config
            .drop_model
            .probability(analytics.delta_pct, rarity_score, pct_saved),
        is_hot_deal: analytics.delta_pct >= config.hot_deal_min_delta
            && analytics.rarity <= config.hot_deal_max_rarity,
    })
}

/// Join flights and hotels into package candidates.
///
/// Flights without analytic fields, with an unmapped destination or without
/// any compatible hotel produce nothing. Candidates come out in flight order,
/// then hotel order.
pub fn assemble(
    flights: &[FlightObservation],
    hotels: &[HotelObservation],
    config: &PackageConfig,
) -> Vec<PackageDraft> {
    let mut candidates = Vec::new();

    for flight in flights {
        if flight.analytics.is_none() || !flight.has_valid_price() {
            continue;
        }
        let Some(region) = config.dest_regions.get(&flight.dest) else {
            debug!(
                "Package assembler: no region mapped for destination {}",
                flight.dest
            );
            continue;
        };

        let before = candidates.len();
        for hotel in hotels {
            if hotel.region != *region || hotel.check_in != flight.date {
                continue;
            }
            if !hotel.has_valid_price() || !config.stay_policy.accepts(hotel.stay_nights()) {
                continue;
            }
            if let Some(draft) = price_package(flight, hotel, region, config) {
                candidates.push(draft);
            }
        }

        if candidates.len() == before {
            debug!(
                "Package assembler: no compatible hotel for {} on {}",
                flight.route(),
                flight.date
            );
        }
    }

    candidates
}

/// Keep the best candidate per `(origin, dest, depart_date, stay_nights)`.
///
/// The highest `pct_saved` wins and ties keep the first one seen. Survivors
/// keep the order in which their key first appeared.
pub fn deduplicate(candidates: Vec<PackageDraft>) -> Vec<PackageDraft> {
    let mut best: Vec<PackageDraft> = Vec::new();
    let mut index: HashMap<PackageKey, usize> = HashMap::new();

    for candidate in candidates {
        match index.get(&candidate.key()) {
            Some(&slot) => {
                if candidate.pct_saved > best[slot].pct_saved {
                    best[slot] = candidate;
                }
            }
            None => {
                index.insert(candidate.key(), best.len());
                best.push(candidate);
            }
        }
    }

    best
}

/// Rebuild the stored package set from recent scored observations.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `config` - Window, pricing thresholds, stay policy and region map
///
/// # Returns
/// * `Ok(PackageBuildSummary)` - Created, candidate and superseded counts
/// * `Err(ServiceError::Repository)` - If listing, deleting or inserting fails
pub async fn build_packages<R: FullRepository + ?Sized>(
    repo: &R,
    config: &PackageConfig,
) -> ServiceResult<PackageBuildSummary> {
    build_packages_at(repo, config, Utc::now()).await
}

/// [`build_packages`] with an explicit clock for the capture window.
pub async fn build_packages_at<R: FullRepository + ?Sized>(
    repo: &R,
    config: &PackageConfig,
    now: DateTime<Utc>,
) -> ServiceResult<PackageBuildSummary> {
    if config.window_days < 0 {
        return Err(ServiceError::InvalidConfig(format!(
            "packages.window_days must not be negative, got {}",
            config.window_days
        )));
    }
    let since = now - Duration::days(config.window_days);
    info!("Service layer: building packages from observations since {}", since);

    let flights: Vec<FlightObservation> = repo
        .list_observations(ObservationKind::Flight, Some(since))
        .await
        .map_err(|e| e.with_operation("build_packages:list_flights"))?
        .into_iter()
        .filter_map(|obs| obs.as_flight().cloned())
        .collect();
    let hotels: Vec<HotelObservation> = repo
        .list_observations(ObservationKind::Hotel, Some(since))
        .await
        .map_err(|e| e.with_operation("build_packages:list_hotels"))?
        .into_iter()
        .filter_map(|obs| obs.as_hotel().cloned())
        .collect();

    let candidates = assemble(&flights, &hotels, config);
    let candidate_count = candidates.len();
    let survivors = deduplicate(candidates);
    info!(
        "Service layer: {} flights x {} hotels -> {} candidates, {} unique",
        flights.len(),
        hotels.len(),
        candidate_count,
        survivors.len()
    );

    let existing = repo
        .list_packages()
        .await
        .map_err(|e| e.with_operation("build_packages:list_packages"))?;
    for package in &existing {
        repo.delete_package(package.id)
            .await
            .map_err(|e| e.with_operation("build_packages:delete"))?;
    }

    for draft in &survivors {
        repo.insert_package(draft).await.map_err(|e| {
            warn!(
                "Service layer: failed to save package {}-{} {} ({} nights): {}",
                draft.origin, draft.dest, draft.depart_date, draft.stay_nights, e
            );
            e.with_operation("build_packages:insert")
        })?;
    }

    let summary = PackageBuildSummary {
        created: survivors.len(),
        candidates: candidate_count,
        superseded: existing.len(),
    };
    info!(
        "Service layer: saved {} packages ({} superseded)",
        summary.created, summary.superseded
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "packages_tests.rs"]
mod tests;
