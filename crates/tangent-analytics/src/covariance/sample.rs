//! Unbiased sample covariance estimator.

use super::{CovarianceError, CovarianceEstimator};
use crate::stats;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Sample covariance estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCovarianceConfig {
    /// Minimum number of observations required (default: 2)
    pub min_observations: usize,
}

impl Default for SampleCovarianceConfig {
    fn default() -> Self {
        Self {
            min_observations: stats::MIN_OBSERVATIONS,
        }
    }
}

/// Sample covariance with the T-1 denominator.
#[derive(Debug, Default)]
pub struct SampleCovarianceEstimator {
    config: SampleCovarianceConfig,
}

impl SampleCovarianceEstimator {
    /// Create an estimator; the observation floor never drops below two.
    pub fn new(config: SampleCovarianceConfig) -> Self {
        Self {
            config: SampleCovarianceConfig {
                min_observations: config.min_observations.max(stats::MIN_OBSERVATIONS),
            },
        }
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let n_periods = returns.nrows();
        if n_periods < self.config.min_observations {
            return Err(CovarianceError::InsufficientData {
                required: self.config.min_observations,
                actual: n_periods,
            });
        }

        stats::sample_covariance(returns.view()).map_err(|_| CovarianceError::InsufficientData {
            required: self.config.min_observations,
            actual: n_periods,
        })
    }

    fn name(&self) -> &'static str {
        "sample"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_covariance() {
        // Perfectly co-moving columns: cov = 2 * var
        let returns = Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 2.0, 4.0, 3.0, 6.0]).unwrap();
        let cov = SampleCovarianceEstimator::default().estimate(&returns).unwrap();
        assert_relative_eq!(cov[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 1]], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_min_observations() {
        let estimator = SampleCovarianceEstimator::new(SampleCovarianceConfig {
            min_observations: 5,
        });
        let returns = Array2::<f64>::zeros((4, 2));
        assert!(matches!(
            estimator.estimate(&returns),
            Err(CovarianceError::InsufficientData {
                required: 5,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_floor_is_two() {
        let estimator = SampleCovarianceEstimator::new(SampleCovarianceConfig {
            min_observations: 0,
        });
        let returns = Array2::<f64>::zeros((1, 2));
        assert!(estimator.estimate(&returns).is_err());
    }
}
