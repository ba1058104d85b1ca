//! Price observations captured for flight routes and hotel regions.
//!
//! Flights and hotels are kept as separate records; the analytics engine only
//! sees them through [`ScoredObservation`], which exposes exactly what the
//! series builder, fitter, scorer and package assembler need.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

crate::define_id_type!(
    /// Observation identifier (storage primary key).
    i64,
    ObservationId
);

/// Which family of observations a record (or a batch run) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Flight,
    Hotel,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Flight => "flight",
            ObservationKind::Hotel => "hotel",
        }
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flight" | "flights" => Ok(Self::Flight),
            "hotel" | "hotels" => Ok(Self::Hotel),
            _ => Err(format!("Unknown observation kind: {}", s)),
        }
    }
}

/// Derived statistical fields attached by the baseline refresh.
///
/// Always written as a unit: every field comes from the same Holt-Winters fit
/// over the full series that contains the observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticFields {
    /// Rounded in-sample one-step-ahead prediction.
    pub expected_price: f64,
    /// `(expected - actual) / expected`, positive when the price is below baseline.
    pub delta_pct: f64,
    /// Robust (MAD-based) deviation score.
    pub z_score: f64,
    /// Empirical CDF position of the price within its series, in `[0, 1]`.
    pub rarity: f64,
    pub is_anomaly: bool,
    pub model_updated_at: DateTime<Utc>,
}

/// A flight fare for one origin/destination pair on one travel date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightObservation {
    pub id: ObservationId,
    pub origin: String,
    pub dest: String,
    /// Departure date.
    pub date: NaiveDate,
    pub price: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub analytics: Option<AnalyticFields>,
}

impl FlightObservation {
    /// Route key in `ORIGIN-DEST` form.
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.dest)
    }
}

/// A nightly hotel rate for one region and one stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelObservation {
    pub id: ObservationId,
    pub region: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nightly_price: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub analytics: Option<AnalyticFields>,
}

impl HotelObservation {
    /// Number of nights between check-in and check-out (may be zero or negative
    /// for malformed records).
    pub fn stay_nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Common view over flight and hotel observations.
pub trait ScoredObservation {
    fn id(&self) -> ObservationId;

    /// Grouping key: route for flights, region for hotels.
    fn series_key(&self) -> String;

    /// Calendar day the price applies to (departure or check-in).
    fn travel_date(&self) -> NaiveDate;

    fn price(&self) -> f64;

    fn captured_at(&self) -> DateTime<Utc>;

    fn analytics(&self) -> Option<&AnalyticFields>;

    fn kind(&self) -> ObservationKind;

    /// Prices that can enter a series: finite and strictly positive.
    fn has_valid_price(&self) -> bool {
        let price = self.price();
        price.is_finite() && price > 0.0
    }
}

impl ScoredObservation for FlightObservation {
    fn id(&self) -> ObservationId {
        self.id
    }

    fn series_key(&self) -> String {
        self.route()
    }

    fn travel_date(&self) -> NaiveDate {
        self.date
    }

    fn price(&self) -> f64 {
        self.price
    }

    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn analytics(&self) -> Option<&AnalyticFields> {
        self.analytics.as_ref()
    }

    fn kind(&self) -> ObservationKind {
        ObservationKind::Flight
    }
}

impl ScoredObservation for HotelObservation {
    fn id(&self) -> ObservationId {
        self.id
    }

    fn series_key(&self) -> String {
        self.region.clone()
    }

    fn travel_date(&self) -> NaiveDate {
        self.check_in
    }

    fn price(&self) -> f64 {
        self.nightly_price
    }

    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn analytics(&self) -> Option<&AnalyticFields> {
        self.analytics.as_ref()
    }

    fn kind(&self) -> ObservationKind {
        ObservationKind::Hotel
    }
}

/// Storage-level record: either variant, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PriceObservation {
    Flight(FlightObservation),
    Hotel(HotelObservation),
}

impl PriceObservation {
    pub fn as_flight(&self) -> Option<&FlightObservation> {
        match self {
            PriceObservation::Flight(f) => Some(f),
            PriceObservation::Hotel(_) => None,
        }
    }

    pub fn as_hotel(&self) -> Option<&HotelObservation> {
        match self {
            PriceObservation::Hotel(h) => Some(h),
            PriceObservation::Flight(_) => None,
        }
    }

    /// Replace the analytic fields wholesale.
    pub fn set_analytics(&mut self, fields: AnalyticFields) {
        match self {
            PriceObservation::Flight(f) => f.analytics = Some(fields),
            PriceObservation::Hotel(h) => h.analytics = Some(fields),
        }
    }

    pub(crate) fn set_id(&mut self, id: ObservationId) {
        match self {
            PriceObservation::Flight(f) => f.id = id,
            PriceObservation::Hotel(h) => h.id = id,
        }
    }

    fn inner(&self) -> &dyn ScoredObservation {
        match self {
            PriceObservation::Flight(f) => f,
            PriceObservation::Hotel(h) => h,
        }
    }
}

impl From<FlightObservation> for PriceObservation {
    fn from(value: FlightObservation) -> Self {
        PriceObservation::Flight(value)
    }
}

impl From<HotelObservation> for PriceObservation {
    fn from(value: HotelObservation) -> Self {
        PriceObservation::Hotel(value)
    }
}

impl ScoredObservation for PriceObservation {
    fn id(&self) -> ObservationId {
        self.inner().id()
    }

    fn series_key(&self) -> String {
        self.inner().series_key()
    }

    fn travel_date(&self) -> NaiveDate {
        self.inner().travel_date()
    }

    fn price(&self) -> f64 {
        self.inner().price()
    }

    fn captured_at(&self) -> DateTime<Utc> {
        self.inner().captured_at()
    }

    fn analytics(&self) -> Option<&AnalyticFields> {
        match self {
            PriceObservation::Flight(f) => f.analytics.as_ref(),
            PriceObservation::Hotel(h) => h.analytics.as_ref(),
        }
    }

    fn kind(&self) -> ObservationKind {
        self.inner().kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hotel(check_in: &str, check_out: &str) -> HotelObservation {
        HotelObservation {
            id: ObservationId::new(1),
            region: "ORL".to_string(),
            check_in: check_in.parse().unwrap(),
            check_out: check_out.parse().unwrap(),
            nightly_price: 120.0,
            captured_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            analytics: None,
        }
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        assert_eq!("flight".parse::<ObservationKind>().unwrap(), ObservationKind::Flight);
        assert_eq!("Hotels".parse::<ObservationKind>().unwrap(), ObservationKind::Hotel);
        assert!("train".parse::<ObservationKind>().is_err());
        assert_eq!(ObservationKind::Hotel.to_string(), "hotel");
    }

    #[test]
    fn test_hotel_stay_nights() {
        assert_eq!(hotel("2025-01-15", "2025-01-22").stay_nights(), 7);
        assert_eq!(hotel("2025-01-15", "2025-01-15").stay_nights(), 0);
    }

    #[test]
    fn test_enum_delegates_to_variant() {
        let obs: PriceObservation = hotel("2025-03-01", "2025-03-04").into();
        assert_eq!(obs.series_key(), "ORL");
        assert_eq!(obs.kind(), ObservationKind::Hotel);
        assert_eq!(obs.price(), 120.0);
        assert!(obs.has_valid_price());
        assert!(obs.as_flight().is_none());
    }

    #[test]
    fn test_serde_tagging() {
        let json = r#"{
            "type": "flight",
            "id": 7,
            "origin": "JFK",
            "dest": "MCO",
            "date": "2025-01-15",
            "price": 129.0,
            "captured_at": "2025-01-01T00:00:00Z"
        }"#;
        let obs: PriceObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.series_key(), "JFK-MCO");
        assert_eq!(obs.id(), ObservationId::new(7));
        assert!(obs.analytics().is_none());
    }
}
