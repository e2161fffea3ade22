//! Covariance estimation
//!
//! Provides estimators for the covariance matrix of asset returns, the
//! second input (after expected returns) of the mean-variance builder.

pub mod ewma;
pub mod sample;

pub use ewma::{EwmaConfig, EwmaCovarianceEstimator};
pub use sample::{SampleCovarianceConfig, SampleCovarianceEstimator};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Invalid decay parameter
    #[error("Invalid decay parameter: {0} (must be between 0 and 1)")]
    InvalidDecay(f64),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from asset returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a period and each column is an asset
    ///
    /// # Returns
    /// * Estimated covariance matrix (N x N where N is number of assets)
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;

    /// Short name used in logs and reports
    fn name(&self) -> &'static str;
}

/// Covariance method selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum CovarianceMethod {
    /// Unbiased sample covariance
    #[default]
    Sample,
    /// Exponentially weighted covariance with the given decay
    Ewma {
        /// Decay factor λ in (0, 1)
        decay: f64,
    },
}

impl CovarianceMethod {
    /// Build the estimator for this method.
    pub fn estimator(&self) -> Result<Box<dyn CovarianceEstimator>, CovarianceError> {
        Ok(match *self {
            Self::Sample => Box::new(SampleCovarianceEstimator::default()),
            Self::Ewma { decay } => Box::new(EwmaCovarianceEstimator::new(EwmaConfig {
                decay,
                ..Default::default()
            })?),
        })
    }
}

/// Convert a covariance matrix to a correlation matrix.
///
/// Entries involving a zero-variance asset are NaN.
pub fn correlation_from_covariance(cov: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
    let n = cov.nrows();
    if n != cov.ncols() {
        return Err(CovarianceError::DimensionMismatch {
            expected: n,
            actual: cov.ncols(),
        });
    }

    let std_devs: Vec<f64> = (0..n).map(|i| cov[[i, i]].sqrt()).collect();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        cov[[i, j]] / (std_devs[i] * std_devs[j])
    }))
}

/// Whether a square matrix equals its transpose within `tolerance`.
pub fn is_symmetric(matrix: &Array2<f64>, tolerance: f64) -> bool {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return false;
    }
    (0..n).all(|i| ((i + 1)..n).all(|j| (matrix[[i, j]] - matrix[[j, i]]).abs() <= tolerance))
}
