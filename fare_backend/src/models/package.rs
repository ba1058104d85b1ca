//! Flight + hotel bundles produced by the package assembler.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

crate::define_id_type!(
    /// Package identifier (storage primary key).
    i64,
    PackageId
);

/// Deduplication key: one surviving package per origin, destination,
/// departure date and stay length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageKey {
    pub origin: String,
    pub dest: String,
    pub depart_date: NaiveDate,
    pub stay_nights: u32,
}

/// A package candidate before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDraft {
    pub origin: String,
    pub dest: String,
    pub region: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
    pub stay_nights: u32,
    pub flight_price: f64,
    pub hotel_total: f64,
    pub total_price: f64,
    pub pct_saved: f64,
    /// Mean of flight and hotel rarity (lower = rarer).
    pub rarity_score: f64,
    pub drop_probability: f64,
    pub is_hot_deal: bool,
}

impl PackageDraft {
    pub fn key(&self) -> PackageKey {
        PackageKey {
            origin: self.origin.clone(),
            dest: self.dest.clone(),
            depart_date: self.depart_date,
            stay_nights: self.stay_nights,
        }
    }
}

/// A stored package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: PackageDraft,
}

impl Package {
    pub fn key(&self) -> PackageKey {
        self.details.key()
    }
}
