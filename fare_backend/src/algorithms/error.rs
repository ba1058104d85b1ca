//! Error types for the statistical models.

/// Result type for model fitting and evaluation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by the smoothing models.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Series shorter than two full seasonal cycles.
    #[error("Insufficient data: need at least {required} observations for seasonal period {period}, got {actual}")]
    InsufficientData {
        required: usize,
        actual: usize,
        period: usize,
    },

    #[error("Invalid seasonal period: {0}")]
    InvalidPeriod(usize),

    /// One smoothing combination produced a non-finite fit or lies outside (0, 1).
    #[error("Degenerate smoothing parameters (alpha={alpha}, beta={beta}, gamma={gamma}): {reason}")]
    DegenerateParameters {
        alpha: f64,
        beta: f64,
        gamma: f64,
        reason: String,
    },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}
