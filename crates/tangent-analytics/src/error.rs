//! Error types for analytics operations.

use crate::covariance::CovarianceError;
use tangent_data::DataError;
use thiserror::Error;

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur while computing metrics or building portfolios.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Matrix is singular (or numerically singular) and cannot be inverted
    #[error("Singular matrix: pivot {pivot:e} at column {column} is below tolerance")]
    SingularMatrix {
        /// Column where elimination broke down
        column: usize,
        /// Magnitude of the offending pivot
        pivot: f64,
    },

    /// Weight labels do not match the return table's assets
    #[error("Asset mismatch: {0}")]
    AssetMismatch(String),

    /// Weights cannot be rescaled because they sum to (nearly) zero
    #[error("Cannot normalize weights: sum {0:e} is too close to zero")]
    DegenerateWeights(f64),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Covariance estimation error
    #[error("Covariance error: {0}")]
    Covariance(#[from] CovarianceError),

    /// Data construction error
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}
