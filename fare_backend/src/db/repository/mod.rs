//! Repository trait definitions for the observation and package stores.
//!
//! Responsibilities are split across focused traits so that implementations
//! and test doubles stay small.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`observation`]: Price observations and their analytic fields
//! - [`package`]: Assembled flight + hotel packages
//!
//! # Convenience Trait Bound
//!
//! For functions that need both stores, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository>(repo: &R) -> RepositoryResult<()> {
//!     let hotels = repo.list_observations(ObservationKind::Hotel, None).await?;
//!     let packages = repo.list_packages().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod observation;
pub mod package;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use observation::ObservationRepository;
pub use package::PackageRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements both repository
/// traits.
pub trait FullRepository: ObservationRepository + PackageRepository {}

impl<T> FullRepository for T where T: ObservationRepository + PackageRepository {}
