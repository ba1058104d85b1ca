//! Run-level errors raised by the batch services.

use crate::db::repository::RepositoryError;
use crate::models::ObservationKind;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures that abort a whole run.
///
/// Problems local to one series or one package candidate are logged and
/// counted instead.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Listing, patching, deleting or reading failed in the store.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Not a single series of this kind could be fitted.
    #[error("No valid {kind} series: {skipped} too short, {failed} failed to fit")]
    NoValidGroups {
        kind: ObservationKind,
        skipped: usize,
        failed: usize,
    },

    /// Neither flights nor hotels produced a valid series.
    #[error("No valid series for any observation kind")]
    NothingToRefresh,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    /// `true` for the "nothing could be fitted" outcomes.
    pub fn is_no_valid_groups(&self) -> bool {
        matches!(
            self,
            ServiceError::NoValidGroups { .. } | ServiceError::NothingToRefresh
        )
    }
}
