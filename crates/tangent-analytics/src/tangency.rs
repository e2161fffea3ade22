//! Tangency (maximum-Sharpe) portfolio.
//!
//! The unnormalized tangency weights solve `Σ w = μ`, where `μ` is the vector
//! of expected *excess* returns. When `μ` holds raw returns the caller passes
//! [`ReturnBasis::Raw`] with the per-period risk-free rate, which is
//! subtracted before solving. The resulting weights are proportional to the
//! maximum-Sharpe portfolio; [`Normalization::SumToOne`] rescales them to a
//! fully invested portfolio.

use crate::{
    covariance::{CovarianceEstimator, SampleCovarianceEstimator},
    error::{AnalyticsError, Result},
    linalg::LuDecomposition,
    stats,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tangent_data::ReturnTable;
use tracing::{debug, info};

/// Weight sums with magnitude at or below this cannot be normalized.
pub const MIN_WEIGHT_SUM: f64 = 1e-12;

/// Whether expected returns are already net of the risk-free rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "basis")]
pub enum ReturnBasis {
    /// Expected returns are excess returns and are used as given.
    #[default]
    Excess,
    /// Expected returns are raw; subtract the per-period risk-free rate.
    Raw {
        /// Per-period risk-free rate
        risk_free: f64,
    },
}

impl ReturnBasis {
    /// Convert expected returns to excess returns.
    pub fn excess(&self, mu: &Array1<f64>) -> Array1<f64> {
        match *self {
            Self::Excess => mu.clone(),
            Self::Raw { risk_free } => mu - risk_free,
        }
    }
}

/// Optional rescaling applied after solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Keep the raw `Σ⁻¹μ` weights.
    #[default]
    None,
    /// Rescale so the weights sum to one.
    SumToOne,
}

/// Tangency weights `w = Σ⁻¹μ` (unnormalized), aligned with `mu`.
///
/// # Errors
///
/// - [`AnalyticsError::DimensionMismatch`] if `sigma` is not `n x n`
/// - [`AnalyticsError::SingularMatrix`] if `sigma` is (numerically) singular
pub fn tangency_weights(
    mu: &Array1<f64>,
    sigma: &Array2<f64>,
    basis: ReturnBasis,
) -> Result<Array1<f64>> {
    check_shapes(mu, sigma)?;
    let excess = basis.excess(mu);
    LuDecomposition::new(sigma)?.solve(&excess)
}

/// Periodic Sharpe ratio of the tangency portfolio: `sqrt(μ'Σ⁻¹μ)`.
pub fn tangency_sharpe(mu: &Array1<f64>, sigma: &Array2<f64>, basis: ReturnBasis) -> Result<f64> {
    let weights = tangency_weights(mu, sigma, basis)?;
    Ok(basis.excess(mu).dot(&weights).max(0.0).sqrt())
}

/// Rescale weights according to `normalization`.
pub fn normalize_weights(weights: &Array1<f64>, normalization: Normalization) -> Result<Array1<f64>> {
    match normalization {
        Normalization::None => Ok(weights.clone()),
        Normalization::SumToOne => {
            let total = weights.sum();
            if !total.is_finite() || total.abs() <= MIN_WEIGHT_SUM {
                return Err(AnalyticsError::DegenerateWeights(total));
            }
            Ok(weights / total)
        }
    }
}

/// Expected periodic return `w'μ`.
pub fn portfolio_mean(weights: &Array1<f64>, mu: &Array1<f64>) -> Result<f64> {
    if weights.len() != mu.len() {
        return Err(AnalyticsError::DimensionMismatch {
            expected: mu.len(),
            actual: weights.len(),
        });
    }
    Ok(weights.dot(mu))
}

/// Periodic volatility `sqrt(w'Σw)`.
pub fn portfolio_volatility(weights: &Array1<f64>, sigma: &Array2<f64>) -> Result<f64> {
    check_shapes(weights, sigma)?;
    Ok(weights.dot(&sigma.dot(weights)).max(0.0).sqrt())
}

fn check_shapes(vector: &Array1<f64>, matrix: &Array2<f64>) -> Result<()> {
    let n = vector.len();
    if matrix.nrows() != n {
        return Err(AnalyticsError::DimensionMismatch {
            expected: n,
            actual: matrix.nrows(),
        });
    }
    if matrix.ncols() != n {
        return Err(AnalyticsError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }
    Ok(())
}

/// One weight per asset, in a fixed asset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    assets: Vec<String>,
    weights: Vec<f64>,
}

impl WeightVector {
    /// Pair asset ids with weights. Ids must be unique.
    pub fn new(assets: Vec<String>, weights: Vec<f64>) -> Result<Self> {
        if assets.len() != weights.len() {
            return Err(AnalyticsError::DimensionMismatch {
                expected: assets.len(),
                actual: weights.len(),
            });
        }
        let mut seen = HashSet::with_capacity(assets.len());
        if let Some(dup) = assets.iter().find(|a| !seen.insert(a.as_str())) {
            return Err(AnalyticsError::AssetMismatch(format!(
                "duplicate asset '{dup}' in weights"
            )));
        }
        Ok(Self { assets, weights })
    }

    /// Asset ids.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Weights, aligned with [`Self::assets`].
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight of one asset.
    pub fn get(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.weights[i])
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of weights.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Weights as an ndarray vector.
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(self.weights.clone())
    }

    /// Rescaled copy.
    pub fn normalized(&self, normalization: Normalization) -> Result<Self> {
        let weights = normalize_weights(&self.to_array(), normalization)?;
        Ok(Self {
            assets: self.assets.clone(),
            weights: weights.to_vec(),
        })
    }

    /// Weights reordered to follow `order`, which must name exactly the same
    /// assets.
    pub fn aligned_to(&self, order: &[String]) -> Result<Array1<f64>> {
        if order.len() != self.assets.len() {
            return Err(AnalyticsError::AssetMismatch(format!(
                "weights cover {} assets, table has {}",
                self.assets.len(),
                order.len()
            )));
        }
        order
            .iter()
            .map(|asset| {
                self.get(asset).ok_or_else(|| {
                    AnalyticsError::AssetMismatch(format!("no weight for asset '{asset}'"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    /// Iterate over `(asset, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }
}

/// Tangency portfolio together with the inputs it was built from.
#[derive(Debug, Clone)]
pub struct TangencyPortfolio {
    weights: WeightVector,
    excess_mu: Array1<f64>,
    sigma: Array2<f64>,
    basis: ReturnBasis,
}

impl TangencyPortfolio {
    /// Build from expected returns and a covariance matrix.
    pub fn new(
        assets: Vec<String>,
        mu: Array1<f64>,
        sigma: Array2<f64>,
        basis: ReturnBasis,
    ) -> Result<Self> {
        let weights = tangency_weights(&mu, &sigma, basis)?;
        let weights = WeightVector::new(assets, weights.to_vec())?;
        Ok(Self {
            weights,
            excess_mu: basis.excess(&mu),
            sigma,
            basis,
        })
    }

    /// Build from a return table using sample means and the sample covariance.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use ndarray::array;
    /// use tangent_analytics::{ReturnBasis, TangencyPortfolio};
    /// use tangent_data::ReturnTable;
    ///
    /// let dates = (1..=4)
    ///     .map(|m| NaiveDate::from_ymd_opt(2024, m, 28).unwrap())
    ///     .collect();
    /// let table = ReturnTable::new(
    ///     dates,
    ///     vec!["A".into(), "B".into()],
    ///     array![[0.01, 0.00], [0.02, 0.01], [-0.01, 0.01], [0.03, -0.02]],
    /// )
    /// .unwrap();
    ///
    /// let portfolio = TangencyPortfolio::from_returns(&table, ReturnBasis::Excess).unwrap();
    /// assert_eq!(portfolio.weights().assets(), table.assets());
    /// ```
    pub fn from_returns(table: &ReturnTable, basis: ReturnBasis) -> Result<Self> {
        Self::from_returns_with(table, basis, &SampleCovarianceEstimator::default())
    }

    /// Build from a return table with a custom covariance estimator.
    pub fn from_returns_with(
        table: &ReturnTable,
        basis: ReturnBasis,
        estimator: &dyn CovarianceEstimator,
    ) -> Result<Self> {
        let mu = stats::column_means(table.values().view())?;
        let sigma = estimator.estimate(table.values())?;
        debug!(
            estimator = estimator.name(),
            n_assets = table.n_assets(),
            n_periods = table.n_periods(),
            "estimated tangency inputs"
        );
        let portfolio = Self::new(table.assets().to_vec(), mu, sigma, basis)?;
        info!(
            n_assets = table.n_assets(),
            weight_sum = portfolio.weights.sum(),
            sharpe = portfolio.sharpe(),
            "built tangency portfolio"
        );
        Ok(portfolio)
    }

    /// Unnormalized weights `Σ⁻¹μ`.
    pub const fn weights(&self) -> &WeightVector {
        &self.weights
    }

    /// Weights after the given rescaling.
    pub fn normalized(&self, normalization: Normalization) -> Result<WeightVector> {
        self.weights.normalized(normalization)
    }

    /// Return basis used to build the portfolio.
    pub const fn basis(&self) -> ReturnBasis {
        self.basis
    }

    /// Expected excess returns used to build the portfolio.
    pub const fn expected_returns(&self) -> &Array1<f64> {
        &self.excess_mu
    }

    /// Covariance matrix used to build the portfolio.
    pub const fn covariance(&self) -> &Array2<f64> {
        &self.sigma
    }

    /// Expected periodic excess return of the unnormalized weights.
    pub fn expected_return(&self) -> f64 {
        self.excess_mu.dot(&self.weights.to_array())
    }

    /// Periodic volatility of the unnormalized weights.
    pub fn volatility(&self) -> f64 {
        let w = self.weights.to_array();
        w.dot(&self.sigma.dot(&w)).max(0.0).sqrt()
    }

    /// Closed-form periodic Sharpe ratio `sqrt(μ'Σ⁻¹μ)`.
    pub fn sharpe(&self) -> f64 {
        self.expected_return().max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_diagonal_covariance() {
        let mu = array![0.02, 0.01];
        let sigma = array![[0.04, 0.0], [0.0, 0.01]];
        let w = tangency_weights(&mu, &sigma, ReturnBasis::Excess).unwrap();
        assert_relative_eq!(w[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solution_satisfies_system() {
        let mu = array![0.01, 0.015, 0.007];
        let sigma = array![[0.04, 0.01, 0.002], [0.01, 0.09, 0.003], [0.002, 0.003, 0.0225]];
        let w = tangency_weights(&mu, &sigma, ReturnBasis::Excess).unwrap();
        let residual = sigma.dot(&w) - &mu;
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn test_raw_basis_subtracts_risk_free() {
        let mu = array![0.03, 0.02];
        let sigma = array![[0.04, 0.0], [0.0, 0.01]];
        let raw = tangency_weights(&mu, &sigma, ReturnBasis::Raw { risk_free: 0.01 }).unwrap();
        let excess = tangency_weights(&array![0.02, 0.01], &sigma, ReturnBasis::Excess).unwrap();
        assert_relative_eq!(raw[0], excess[0], epsilon = 1e-12);
        assert_relative_eq!(raw[1], excess[1], epsilon = 1e-12);
    }

    #[test]
    fn test_singular_covariance_fails() {
        let mu = array![0.01, 0.02];
        let sigma = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            tangency_weights(&mu, &sigma, ReturnBasis::Excess),
            Err(AnalyticsError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let mu = array![0.01, 0.02, 0.03];
        let sigma = Array2::<f64>::eye(2);
        assert!(matches!(
            tangency_weights(&mu, &sigma, ReturnBasis::Excess),
            Err(AnalyticsError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_sum_to_one() {
        let w = array![0.5, 1.5];
        let n = normalize_weights(&w, Normalization::SumToOne).unwrap();
        assert_relative_eq!(n.sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n[0], 0.25, epsilon = 1e-12);
        assert_eq!(normalize_weights(&w, Normalization::None).unwrap(), w);
    }

    #[test]
    fn test_sum_to_one_rejects_zero_sum() {
        let w = array![1.0, -1.0];
        assert!(matches!(
            normalize_weights(&w, Normalization::SumToOne),
            Err(AnalyticsError::DegenerateWeights(_))
        ));
    }

    #[test]
    fn test_closed_form_sharpe() {
        let mu = array![0.02, 0.01];
        let sigma = array![[0.04, 0.0], [0.0, 0.01]];
        // mu' Σ^-1 mu = 0.0004 / 0.04 + 0.0001 / 0.01 = 0.02
        let sharpe = tangency_sharpe(&mu, &sigma, ReturnBasis::Excess).unwrap();
        assert_relative_eq!(sharpe, 0.02_f64.sqrt(), epsilon = 1e-12);

        let portfolio =
            TangencyPortfolio::new(vec!["A".into(), "B".into()], mu, sigma, ReturnBasis::Excess)
                .unwrap();
        assert_relative_eq!(portfolio.sharpe(), sharpe, epsilon = 1e-12);
        assert_relative_eq!(
            portfolio.expected_return() / portfolio.volatility(),
            sharpe,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_weight_vector_alignment() {
        let w = WeightVector::new(vec!["A".into(), "B".into()], vec![0.3, 0.7]).unwrap();
        let aligned = w.aligned_to(&["B".to_string(), "A".to_string()]).unwrap();
        assert_eq!(aligned, array![0.7, 0.3]);
        assert!(w.aligned_to(&["A".to_string(), "C".to_string()]).is_err());
        assert!(w.aligned_to(&["A".to_string()]).is_err());
    }

    #[test]
    fn test_weight_vector_rejects_duplicates() {
        assert!(matches!(
            WeightVector::new(vec!["A".into(), "A".into()], vec![0.5, 0.5]),
            Err(AnalyticsError::AssetMismatch(_))
        ));
    }

    #[test]
    fn test_portfolio_helpers() {
        let w = array![1.0, 2.0];
        let sigma = array![[0.04, 0.0], [0.0, 0.01]];
        assert_relative_eq!(portfolio_mean(&w, &array![0.01, 0.02]).unwrap(), 0.05);
        assert_relative_eq!(portfolio_volatility(&w, &sigma).unwrap(), 0.08_f64.sqrt());
    }
}
