//! In-memory local repository implementation.
//!
//! Implements every repository trait on top of ordered maps guarded by a
//! single `parking_lot` lock. Used by the batch binary for local runs and by
//! the test suites for fast, deterministic, isolated execution.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::{
    AnalyticFields, ObservationId, ObservationKind, Package, PackageDraft, PackageId,
    PriceObservation, ScoredObservation,
};

/// In-memory local repository.
///
/// Cloning shares the underlying storage.
///
/// # Example
/// ```ignore
/// use fare_backend::db::repositories::LocalRepository;
///
/// #[tokio::test]
/// async fn test_observation_storage() {
///     let repo = LocalRepository::new();
///     repo.store_observation_impl(flight.into());
///
///     let flights = repo.list_observations(ObservationKind::Flight, None).await.unwrap();
///     assert_eq!(flights.len(), 1);
/// }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    observations: BTreeMap<ObservationId, PriceObservation>,
    packages: BTreeMap<PackageId, Package>,

    // ID counters
    next_observation_id: i64,
    next_package_id: i64,

    // Failure injection
    is_healthy: bool,
    rejected_package_dests: HashSet<String>,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            observations: BTreeMap::new(),
            packages: BTreeMap::new(),
            next_observation_id: 1,
            next_package_id: 1,
            is_healthy: true,
            rejected_package_dests: HashSet::new(),
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Add an observation without going through the async API.
    ///
    /// # Arguments
    /// * `observation` - Observation to add (its id will be overwritten)
    ///
    /// # Returns
    /// The ID assigned to the observation
    pub fn store_observation_impl(&self, mut observation: PriceObservation) -> ObservationId {
        let mut data = self.data.write();
        let id = ObservationId::new(data.next_observation_id);
        data.next_observation_id += 1;
        observation.set_id(id);
        data.observations.insert(id, observation);
        id
    }

    /// Add many observations, returning their IDs in input order.
    pub fn store_observations_impl<I>(&self, observations: I) -> Vec<ObservationId>
    where
        I: IntoIterator<Item = PriceObservation>,
    {
        observations
            .into_iter()
            .map(|obs| self.store_observation_impl(obs))
            .collect()
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Make every package insert for `dest` fail with a query error.
    pub fn reject_packages_to(&self, dest: impl Into<String>) {
        self.data.write().rejected_package_dests.insert(dest.into());
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    pub fn observation_count(&self) -> usize {
        self.data.read().observations.len()
    }

    pub fn package_count(&self) -> usize {
        self.data.read().packages.len()
    }

    /// Snapshot of one observation, if present.
    pub fn observation(&self, id: ObservationId) -> Option<PriceObservation> {
        self.data.read().observations.get(&id).cloned()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Local store is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservationRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn list_observations(
        &self,
        kind: ObservationKind,
        since: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Vec<PriceObservation>> {
        self.check_health("list_observations")?;
        let data = self.data.read();
        Ok(data
            .observations
            .values()
            .filter(|obs| obs.kind() == kind)
            .filter(|obs| since.map_or(true, |cutoff| obs.captured_at() >= cutoff))
            .cloned()
            .collect())
    }

    async fn get_observation(&self, id: ObservationId) -> RepositoryResult<PriceObservation> {
        self.check_health("get_observation")?;
        self.data.read().observations.get(&id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Observation {} not found", id),
                ErrorContext::new("get_observation")
                    .with_entity("observation")
                    .with_entity_id(id),
            )
        })
    }

    async fn store_observation(
        &self,
        observation: PriceObservation,
    ) -> RepositoryResult<ObservationId> {
        self.check_health("store_observation")?;
        if !observation.has_valid_price() {
            return Err(RepositoryError::validation_with_context(
                format!("Price must be finite and positive, got {}", observation.price()),
                ErrorContext::new("store_observation").with_entity("observation"),
            ));
        }
        Ok(self.store_observation_impl(observation))
    }

    async fn patch_observation(
        &self,
        id: ObservationId,
        fields: &AnalyticFields,
    ) -> RepositoryResult<()> {
        self.check_health("patch_observation")?;
        let mut data = self.data.write();
        let observation = data.observations.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Observation {} not found", id),
                ErrorContext::new("patch_observation")
                    .with_entity("observation")
                    .with_entity_id(id),
            )
        })?;
        observation.set_analytics(fields.clone());
        Ok(())
    }
}

#[async_trait]
impl PackageRepository for LocalRepository {
    async fn list_packages(&self) -> RepositoryResult<Vec<Package>> {
        self.check_health("list_packages")?;
        Ok(self.data.read().packages.values().cloned().collect())
    }

    async fn delete_package(&self, id: PackageId) -> RepositoryResult<()> {
        self.check_health("delete_package")?;
        match self.data.write().packages.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::not_found_with_context(
                format!("Package {} not found", id),
                ErrorContext::new("delete_package")
                    .with_entity("package")
                    .with_entity_id(id),
            )),
        }
    }

    async fn insert_package(&self, draft: &PackageDraft) -> RepositoryResult<Package> {
        self.check_health("insert_package")?;
        let mut data = self.data.write();
        if data.rejected_package_dests.contains(&draft.dest) {
            return Err(RepositoryError::query_with_context(
                format!("Insert rejected for destination {}", draft.dest),
                ErrorContext::new("insert_package").with_entity("package"),
            ));
        }

        let id = PackageId::new(data.next_package_id);
        data.next_package_id += 1;
        let package = Package {
            id,
            created_at: Utc::now(),
            details: draft.clone(),
        };
        data.packages.insert(id, package.clone());
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightObservation, HotelObservation};
    use chrono::{NaiveDate, TimeZone};

    fn captured(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
    }

    fn flight(price: f64, day: u32) -> PriceObservation {
        FlightObservation {
            id: ObservationId::new(0),
            origin: "JFK".to_string(),
            dest: "MCO".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
            price,
            captured_at: captured(day),
            analytics: None,
        }
        .into()
    }

    fn hotel(price: f64, day: u32) -> PriceObservation {
        HotelObservation {
            id: ObservationId::new(0),
            region: "ORL".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 2, day + 3).unwrap(),
            nightly_price: price,
            captured_at: captured(day),
            analytics: None,
        }
        .into()
    }

    fn draft(dest: &str) -> PackageDraft {
        PackageDraft {
            origin: "JFK".to_string(),
            dest: dest.to_string(),
            region: "ORL".to_string(),
            depart_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2025, 1, 22).unwrap(),
            stay_nights: 7,
            flight_price: 100.0,
            hotel_total: 700.0,
            total_price: 800.0,
            pct_saved: 0.1,
            rarity_score: 0.3,
            drop_probability: 0.4,
            is_hot_deal: false,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        assert!(matches!(
            repo.list_observations(ObservationKind::Flight, None).await,
            Err(RepositoryError::ConnectionError { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_capture_time() {
        let repo = LocalRepository::new();
        repo.store_observations_impl(vec![flight(100.0, 1), flight(110.0, 5), hotel(90.0, 3)]);

        let flights = repo
            .list_observations(ObservationKind::Flight, None)
            .await
            .unwrap();
        assert_eq!(flights.len(), 2);

        let recent = repo
            .list_observations(ObservationKind::Flight, Some(captured(3)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].price(), 110.0);

        let hotels = repo
            .list_observations(ObservationKind::Hotel, None)
            .await
            .unwrap();
        assert_eq!(hotels.len(), 1);
    }

    #[tokio::test]
    async fn test_store_assigns_ids_and_validates_price() {
        let repo = LocalRepository::new();
        let first = repo.store_observation(flight(100.0, 1)).await.unwrap();
        let second = repo.store_observation(hotel(80.0, 2)).await.unwrap();
        assert_eq!(first, ObservationId::new(1));
        assert_eq!(second, ObservationId::new(2));
        assert_eq!(repo.get_observation(second).await.unwrap().id(), second);

        let err = repo.store_observation(flight(0.0, 3)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(repo.observation_count(), 2);
    }

    #[tokio::test]
    async fn test_patch_observation() {
        let repo = LocalRepository::new();
        let id = repo.store_observation_impl(flight(100.0, 1));
        let fields = AnalyticFields {
            expected_price: 120.0,
            delta_pct: 1.0 / 6.0,
            z_score: -1.2,
            rarity: 0.25,
            is_anomaly: false,
            model_updated_at: captured(10),
        };

        repo.patch_observation(id, &fields).await.unwrap();
        let stored = repo.get_observation(id).await.unwrap();
        assert_eq!(stored.analytics(), Some(&fields));

        let missing = repo.patch_observation(ObservationId::new(99), &fields).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_package_insert_list_delete() {
        let repo = LocalRepository::new();
        let stored = repo.insert_package(&draft("MCO")).await.unwrap();
        assert_eq!(stored.details, draft("MCO"));
        assert_eq!(repo.list_packages().await.unwrap().len(), 1);

        repo.delete_package(stored.id).await.unwrap();
        assert_eq!(repo.package_count(), 0);
        assert!(repo.delete_package(stored.id).await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_package_destination() {
        let repo = LocalRepository::new();
        repo.reject_packages_to("MIA");
        assert!(repo.insert_package(&draft("MIA")).await.is_err());
        assert!(repo.insert_package(&draft("MCO")).await.is_ok());
        assert_eq!(repo.package_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_keeps_health_flag() {
        let repo = LocalRepository::new();
        repo.store_observation_impl(flight(100.0, 1));
        repo.set_healthy(false);
        repo.clear();
        assert_eq!(repo.observation_count(), 0);
        assert!(!repo.health_check().await.unwrap());
    }
}
