//! Storage layer: repository traits, implementations and factory.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Batch binary / callers                                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (crate::services) - Business Logic        │
//! │  - Baseline refresh                                      │
//! │  - Package assembly                                      │
//! │  - Deal queries                                          │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface    │
//! │  - ObservationRepository                                 │
//! │  - PackageRepository                                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────────────────────┐
//!     │             Local Repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```

pub mod factory;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
pub use repository::{
    ErrorContext, FullRepository, ObservationRepository, PackageRepository, RepositoryError,
    RepositoryResult,
};
