//! Package repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Package, PackageDraft, PackageId};

/// Repository trait for assembled packages.
///
/// The package set is replaced wholesale on every build, so only list,
/// delete and insert are needed.
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// List all stored packages.
    async fn list_packages(&self) -> RepositoryResult<Vec<Package>>;

    /// Delete a package by ID.
    ///
    /// # Returns
    /// * `Ok(())` - Package removed
    /// * `Err(RepositoryError::NotFound)` - If the package doesn't exist
    async fn delete_package(&self, id: PackageId) -> RepositoryResult<()>;

    /// Persist a package candidate.
    ///
    /// # Returns
    /// * `Ok(Package)` - The stored package with its assigned ID and creation time
    /// * `Err(RepositoryError)` - If the write fails
    async fn insert_package(&self, draft: &PackageDraft) -> RepositoryResult<Package>;
}
