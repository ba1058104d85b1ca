//! Observation repository trait.
//!
//! Covers what the baseline refresh and the deal queries need from the
//! observation store: listing by kind, point lookups, writing the analytic
//! fields back, and ingesting new observations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{AnalyticFields, ObservationId, ObservationKind, PriceObservation};

/// Repository trait for price observations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Reads ====================

    /// List observations of one kind.
    ///
    /// # Arguments
    /// * `kind` - Flights or hotels
    /// * `since` - When set, only observations captured at or after this instant
    ///
    /// # Returns
    /// * `Ok(Vec<PriceObservation>)` - Matching observations in storage order
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_observations(
        &self,
        kind: ObservationKind,
        since: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Vec<PriceObservation>>;

    /// Get a single observation by ID.
    ///
    /// # Returns
    /// * `Ok(PriceObservation)` - The observation
    /// * `Err(RepositoryError::NotFound)` - If it doesn't exist
    async fn get_observation(&self, id: ObservationId) -> RepositoryResult<PriceObservation>;

    // ==================== Writes ====================

    /// Store a new observation and return its assigned ID.
    ///
    /// The `id` carried by `observation` is ignored.
    async fn store_observation(
        &self,
        observation: PriceObservation,
    ) -> RepositoryResult<ObservationId>;

    /// Replace the analytic fields of an observation.
    ///
    /// # Arguments
    /// * `id` - The observation to patch
    /// * `fields` - The complete set of derived fields from one fit
    ///
    /// # Returns
    /// * `Ok(())` - Fields written
    /// * `Err(RepositoryError::NotFound)` - If the observation doesn't exist
    async fn patch_observation(
        &self,
        id: ObservationId,
        fields: &AnalyticFields,
    ) -> RepositoryResult<()>;
}
