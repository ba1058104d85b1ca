//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fare_backend::db::repositories::LocalRepository;
use fare_backend::models::{
    AnalyticFields, FlightObservation, HotelObservation, ObservationId, PriceObservation,
};
use std::collections::HashSet;
use std::sync::Mutex;

/// Fourteen days of a weekly pattern around 100.
pub const WEEKLY_PRICES: [f64; 14] = [
    100.0, 102.0, 98.0, 101.0, 103.0, 99.0, 100.0, 100.0, 103.0, 97.0, 102.0, 104.0, 98.0, 101.0,
];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn flight(
    origin: &str,
    dest: &str,
    depart: NaiveDate,
    price: f64,
    captured_at: DateTime<Utc>,
) -> PriceObservation {
    FlightObservation {
        id: ObservationId::new(0),
        origin: origin.to_string(),
        dest: dest.to_string(),
        date: depart,
        price,
        captured_at,
        analytics: None,
    }
    .into()
}

pub fn hotel(
    region: &str,
    check_in: NaiveDate,
    nights: i64,
    nightly_price: f64,
    captured_at: DateTime<Utc>,
) -> PriceObservation {
    HotelObservation {
        id: ObservationId::new(0),
        region: region.to_string(),
        check_in,
        check_out: check_in + chrono::Duration::days(nights),
        nightly_price,
        captured_at,
        analytics: None,
    }
    .into()
}

pub fn scored(mut observation: PriceObservation, fields: AnalyticFields) -> PriceObservation {
    observation.set_analytics(fields);
    observation
}

pub fn fields(expected_price: f64, delta_pct: f64, rarity: f64) -> AnalyticFields {
    AnalyticFields {
        expected_price,
        delta_pct,
        z_score: 0.0,
        rarity,
        is_anomaly: false,
        model_updated_at: at(2025, 1, 10, 0),
    }
}

/// Store one flight per price on consecutive departure days in February,
/// captured on consecutive days in January.
pub fn seed_route(repo: &LocalRepository, dest: &str, prices: &[f64]) -> Vec<ObservationId> {
    repo.store_observations_impl(prices.iter().enumerate().map(|(i, &price)| {
        let day = i as u32 + 1;
        flight("JFK", dest, date(2025, 2, day), price, at(2025, 1, day, 8))
    }))
}

/// Same as [`seed_route`] for a hotel region with three-night stays.
pub fn seed_region(repo: &LocalRepository, region: &str, prices: &[f64]) -> Vec<ObservationId> {
    repo.store_observations_impl(prices.iter().enumerate().map(|(i, &price)| {
        let day = i as u32 + 1;
        hotel(region, date(2025, 2, day), 3, price, at(2025, 1, day, 9))
    }))
}

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}
