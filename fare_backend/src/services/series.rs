//! Grouping of raw observations into per-route / per-region price series.
//!
//! A series is rebuilt from storage on every run and never persisted.

use log::debug;
use std::collections::BTreeMap;

use crate::models::ScoredObservation;

/// Observations sharing one series key, in chronological order.
#[derive(Debug, Clone)]
pub struct Series<O> {
    pub key: String,
    pub observations: Vec<O>,
}

impl<O: ScoredObservation> Series<O> {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.price()).collect()
    }
}

/// A group left out because it has too few valid points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSeries {
    pub key: String,
    pub len: usize,
    pub required: usize,
}

/// Result of grouping one batch of observations.
#[derive(Debug, Clone)]
pub struct SeriesSet<O> {
    /// Series long enough to fit, ordered by key.
    pub series: Vec<Series<O>>,
    /// Series below the minimum length, ordered by key.
    pub skipped: Vec<SkippedSeries>,
    /// Observations dropped for a non-positive or non-finite price.
    pub invalid_prices: usize,
}

/// Group observations by series key and order each group.
///
/// Invalid prices are removed before grouping so every kept observation lines
/// up with exactly one price. Each group is sorted ascending by travel date,
/// ties broken by capture time (and then by input order).
///
/// # Arguments
/// * `observations` - One kind of observation, in any order
/// * `min_len` - Minimum number of valid points for a series to be kept
pub fn build_series<O: ScoredObservation>(observations: Vec<O>, min_len: usize) -> SeriesSet<O> {
    let mut invalid_prices = 0;
    let mut groups: BTreeMap<String, Vec<O>> = BTreeMap::new();

    for obs in observations {
        if !obs.has_valid_price() {
            debug!(
                "Series builder: dropping observation {} with invalid price {}",
                obs.id(),
                obs.price()
            );
            invalid_prices += 1;
            continue;
        }
        groups.entry(obs.series_key()).or_default().push(obs);
    }

    let mut series = Vec::new();
    let mut skipped = Vec::new();
    for (key, mut members) in groups {
        if members.len() < min_len {
            skipped.push(SkippedSeries {
                key,
                len: members.len(),
                required: min_len,
            });
            continue;
        }
        members.sort_by_key(|o| (o.travel_date(), o.captured_at()));
        series.push(Series {
            key,
            observations: members,
        });
    }

    SeriesSet {
        series,
        skipped,
        invalid_prices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightObservation, ObservationId};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn flight(id: i64, dest: &str, day: u32, hour: u32, price: f64) -> FlightObservation {
        FlightObservation {
            id: ObservationId::new(id),
            origin: "JFK".to_string(),
            dest: dest.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            price,
            captured_at: Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
            analytics: None,
        }
    }

    #[test]
    fn test_groups_and_sorts_by_travel_date_then_capture() {
        let input = vec![
            flight(1, "MCO", 3, 0, 100.0),
            flight(2, "MCO", 1, 5, 110.0),
            flight(3, "MCO", 1, 2, 105.0),
            flight(4, "MIA", 2, 0, 90.0),
        ];
        let set = build_series(input, 1);

        assert_eq!(set.series.len(), 2);
        assert_eq!(set.series[0].key, "JFK-MCO");
        let ids: Vec<i64> = set.series[0]
            .observations
            .iter()
            .map(|o| o.id.value())
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(set.series[0].prices(), vec![105.0, 110.0, 100.0]);
        assert_eq!(set.series[1].key, "JFK-MIA");
    }

    #[test]
    fn test_short_groups_are_skipped() {
        let mut input: Vec<FlightObservation> =
            (1..=14).map(|d| flight(d as i64, "MCO", d, 0, 100.0)).collect();
        input.extend((1..=6).map(|d| flight(100 + d as i64, "TPA", d, 0, 80.0)));

        let set = build_series(input, 14);
        assert_eq!(set.series.len(), 1);
        assert_eq!(set.series[0].len(), 14);
        assert_eq!(
            set.skipped,
            vec![SkippedSeries {
                key: "JFK-TPA".to_string(),
                len: 6,
                required: 14
            }]
        );
    }

    #[test]
    fn test_invalid_prices_do_not_count_toward_length() {
        let mut input: Vec<FlightObservation> =
            (1..=13).map(|d| flight(d as i64, "MCO", d, 0, 100.0)).collect();
        input.push(flight(14, "MCO", 14, 0, 0.0));
        input.push(flight(15, "MCO", 15, 0, f64::NAN));

        let set = build_series(input, 14);
        assert!(set.series.is_empty());
        assert_eq!(set.invalid_prices, 2);
        assert_eq!(set.skipped[0].len, 13);
    }
}
