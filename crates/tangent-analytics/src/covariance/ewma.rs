//! Exponentially Weighted Moving Average (EWMA) Covariance Estimator
//!
//! Recent periods get geometrically more weight than old ones. Observation
//! `t` of `T` (oldest first) gets weight proportional to λ^(T-1-t); the
//! weights are normalized to sum to one, so the estimate is the weighted
//! covariance around the weighted mean.

use super::{CovarianceError, CovarianceEstimator};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// EWMA covariance estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EwmaConfig {
    /// Decay factor λ (default: 0.94)
    /// Higher values = longer memory
    pub decay: f64,

    /// Minimum number of observations required (default: 12)
    pub min_observations: usize,
}

impl Default for EwmaConfig {
    fn default() -> Self {
        Self {
            decay: 0.94,
            min_observations: 12,
        }
    }
}

/// EWMA covariance estimator
#[derive(Debug)]
pub struct EwmaCovarianceEstimator {
    config: EwmaConfig,
}

impl EwmaCovarianceEstimator {
    /// Create a new EWMA estimator with the given configuration
    pub fn new(config: EwmaConfig) -> Result<Self, CovarianceError> {
        if !(config.decay > 0.0 && config.decay < 1.0) {
            return Err(CovarianceError::InvalidDecay(config.decay));
        }
        Ok(Self { config })
    }

    /// Half-life in periods: ln(0.5) / ln(λ)
    pub fn half_life(&self) -> f64 {
        0.5_f64.ln() / self.config.decay.ln()
    }

    /// Normalized observation weights, oldest first.
    fn weights(&self, n_periods: usize) -> Array1<f64> {
        let lambda = self.config.decay;
        let raw = Array1::from_shape_fn(n_periods, |t| lambda.powi((n_periods - 1 - t) as i32));
        let total = raw.sum();
        raw / total
    }
}

impl CovarianceEstimator for EwmaCovarianceEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let n_periods = returns.nrows();
        let required = self.config.min_observations.max(2);
        if n_periods < required {
            return Err(CovarianceError::InsufficientData {
                required,
                actual: n_periods,
            });
        }

        let weights = self.weights(n_periods);
        let column_weights = weights.view().insert_axis(Axis(1));

        let mean = (returns * &column_weights).sum_axis(Axis(0));
        let centered = returns - &mean.insert_axis(Axis(0));
        let weighted = &centered * &column_weights;

        let mut cov = weighted.t().dot(&centered);
        crate::stats::symmetrize(&mut cov);
        Ok(cov)
    }

    fn name(&self) -> &'static str {
        "ewma"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_decay() {
        for decay in [0.0, 1.0, -0.5, f64::NAN] {
            let config = EwmaConfig {
                decay,
                ..Default::default()
            };
            assert!(EwmaCovarianceEstimator::new(config).is_err());
        }
    }

    #[test]
    fn test_half_life() {
        let estimator = EwmaCovarianceEstimator::new(EwmaConfig {
            decay: 0.5,
            ..Default::default()
        })
        .unwrap();
        assert_relative_eq!(estimator.half_life(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_favor_recent_and_sum_to_one() {
        let estimator = EwmaCovarianceEstimator::new(EwmaConfig::default()).unwrap();
        let w = estimator.weights(10);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);
        assert!(w[9] > w[0]);
        assert_relative_eq!(w[8] / w[9], 0.94, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_returns_have_zero_covariance() {
        let estimator = EwmaCovarianceEstimator::new(EwmaConfig {
            min_observations: 2,
            ..Default::default()
        })
        .unwrap();
        let returns = Array2::from_elem((20, 2), 0.25);
        let cov = estimator.estimate(&returns).unwrap();
        assert!(cov.iter().all(|v| v.abs() < 1e-15));
    }

    #[test]
    fn test_two_point_variance() {
        // Two observations a, b with weights λ/(1+λ), 1/(1+λ)
        let lambda = 0.5;
        let estimator = EwmaCovarianceEstimator::new(EwmaConfig {
            decay: lambda,
            min_observations: 2,
        })
        .unwrap();
        let returns = Array2::from_shape_vec((2, 1), vec![1.0, 3.0]).unwrap();
        let cov = estimator.estimate(&returns).unwrap();

        let w0 = lambda / (1.0 + lambda);
        let w1 = 1.0 / (1.0 + lambda);
        let mean = w0 * 1.0 + w1 * 3.0;
        let expected = w0 * (1.0 - mean).powi(2) + w1 * (3.0 - mean).powi(2);
        assert_relative_eq!(cov[[0, 0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_insufficient_data() {
        let estimator = EwmaCovarianceEstimator::new(EwmaConfig::default()).unwrap();
        let returns = Array2::<f64>::zeros((5, 3));
        assert!(matches!(
            estimator.estimate(&returns),
            Err(CovarianceError::InsufficientData {
                required: 12,
                actual: 5
            })
        ));
    }
}
