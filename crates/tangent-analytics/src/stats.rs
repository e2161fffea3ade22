//! Sample statistics over return columns.
//!
//! Standard deviations and covariances use the unbiased (T-1) denominator,
//! matching the usual spreadsheet and dataframe defaults.

use crate::error::{AnalyticsError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Minimum observations for a sample standard deviation.
pub const MIN_OBSERVATIONS: usize = 2;

fn require(n: usize) -> Result<()> {
    if n < MIN_OBSERVATIONS {
        return Err(AnalyticsError::InsufficientData {
            required: MIN_OBSERVATIONS,
            actual: n,
        });
    }
    Ok(())
}

/// Arithmetic mean.
pub fn mean(values: ArrayView1<'_, f64>) -> Result<f64> {
    values.mean().ok_or(AnalyticsError::InsufficientData {
        required: 1,
        actual: 0,
    })
}

/// Sample standard deviation.
pub fn sample_std(values: ArrayView1<'_, f64>) -> Result<f64> {
    require(values.len())?;
    Ok(values.std(1.0))
}

/// Column means of a T x N matrix.
pub fn column_means(values: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
    values
        .mean_axis(Axis(0))
        .ok_or(AnalyticsError::InsufficientData {
            required: 1,
            actual: 0,
        })
}

/// Sample covariance matrix (N x N) of a T x N matrix.
pub fn sample_covariance(values: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let n_periods = values.nrows();
    require(n_periods)?;

    let means = column_means(values)?;
    let centered = &values - &means.insert_axis(Axis(0));
    let mut cov = centered.t().dot(&centered) / (n_periods - 1) as f64;

    // Products are summed in different orders above and below the diagonal.
    symmetrize(&mut cov);
    Ok(cov)
}

/// Average the matrix with its transpose in place.
pub fn symmetrize(matrix: &mut Array2<f64>) {
    let n = matrix.nrows().min(matrix.ncols());
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (matrix[[i, j]] + matrix[[j, i]]);
            matrix[[i, j]] = avg;
            matrix[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_mean_and_std() {
        let a = array![0.01, 0.02, -0.01];
        assert_relative_eq!(mean(a.view()).unwrap(), 0.02 / 3.0, epsilon = 1e-15);
        // deviations: 1/300, 4/300, -5/300 -> sum of squares 42/90000
        let expected = (42.0 / 90000.0 / 2.0_f64).sqrt();
        assert_relative_eq!(sample_std(a.view()).unwrap(), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_std_requires_two_observations() {
        let a = array![0.01];
        assert!(matches!(
            sample_std(a.view()),
            Err(AnalyticsError::InsufficientData {
                required: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_mean_of_empty_is_error() {
        let a = Array1::<f64>::zeros(0);
        assert!(mean(a.view()).is_err());
    }

    #[test]
    fn test_sample_covariance_matches_variance() {
        let x = array![[0.01, 0.00], [0.02, 0.01], [-0.01, 0.01]];
        let cov = sample_covariance(x.view()).unwrap();
        let var_a = sample_std(x.column(0)).unwrap().powi(2);
        let var_b = sample_std(x.column(1)).unwrap().powi(2);
        assert_relative_eq!(cov[[0, 0]], var_a, epsilon = 1e-15);
        assert_relative_eq!(cov[[1, 1]], var_b, epsilon = 1e-15);
        assert_eq!(cov[[0, 1]], cov[[1, 0]]);
        // cov(A, B) = sum(dA * dB) / 2 with dB = (-2, 1, 1) / 300
        let expected = (1.0 * -2.0 + 4.0 * 1.0 + -5.0 * 1.0) / 90000.0 / 2.0;
        assert_relative_eq!(cov[[0, 1]], expected, epsilon = 1e-15);
    }
}
