//! Dense linear solves for small covariance systems.
//!
//! Factorization is delegated to `nalgebra`'s LU with partial pivoting. A
//! diagonal entry of `U` whose magnitude falls below `tolerance * max|A|`
//! marks the matrix as singular, so exactly or numerically singular
//! covariance matrices fail instead of producing huge meaningless weights.

use crate::error::{AnalyticsError, Result};
use nalgebra::{DMatrix, DVector, Dyn, linalg::LU};
use ndarray::{Array1, Array2};

/// Default relative pivot tolerance.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-12;

/// LU factorization of a square matrix.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: LU<f64, Dyn, Dyn>,
    dim: usize,
}

impl LuDecomposition {
    /// Factor `matrix` with the default pivot tolerance.
    pub fn new(matrix: &Array2<f64>) -> Result<Self> {
        Self::with_tolerance(matrix, DEFAULT_PIVOT_TOLERANCE)
    }

    /// Factor `matrix`, treating pivots below `tolerance * max|A|` as zero.
    pub fn with_tolerance(matrix: &Array2<f64>, tolerance: f64) -> Result<Self> {
        let n = matrix.nrows();
        if n != matrix.ncols() {
            return Err(AnalyticsError::DimensionMismatch {
                expected: n,
                actual: matrix.ncols(),
            });
        }
        if n == 0 {
            return Err(AnalyticsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::InvalidParameter(
                "matrix contains non-finite entries".to_string(),
            ));
        }

        let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let threshold = tolerance * scale;

        let lu = DMatrix::from_fn(n, n, |i, j| matrix[[i, j]]).lu();
        let u = lu.u();
        if let Some((column, pivot)) = (0..n)
            .map(|k| (k, u[(k, k)].abs()))
            .find(|&(_, pivot)| pivot <= threshold)
        {
            return Err(AnalyticsError::SingularMatrix { column, pivot });
        }

        Ok(Self { lu, dim: n })
    }

    /// Dimension of the factored matrix.
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>> {
        if b.len() != self.dim {
            return Err(AnalyticsError::DimensionMismatch {
                expected: self.dim,
                actual: b.len(),
            });
        }
        let rhs = DVector::from_iterator(self.dim, b.iter().copied());
        let x = self.lu.solve(&rhs).ok_or(AnalyticsError::SingularMatrix {
            column: self.dim.saturating_sub(1),
            pivot: 0.0,
        })?;
        Ok(x.iter().copied().collect())
    }

    /// Explicit inverse.
    pub fn inverse(&self) -> Result<Array2<f64>> {
        let inv = self.lu.try_inverse().ok_or(AnalyticsError::SingularMatrix {
            column: self.dim.saturating_sub(1),
            pivot: 0.0,
        })?;
        Ok(Array2::from_shape_fn((self.dim, self.dim), |(i, j)| inv[(i, j)]))
    }
}

/// Solve `A x = b` in one call.
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    LuDecomposition::new(a)?.solve(b)
}
