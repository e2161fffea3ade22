#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod annualization;
pub mod covariance;
pub mod error;
pub mod linalg;
pub mod metrics;
pub mod performance;
pub mod stats;
pub mod tangency;

pub use annualization::Annualization;
pub use covariance::{
    CovarianceError, CovarianceEstimator, CovarianceMethod, EwmaConfig, EwmaCovarianceEstimator,
    SampleCovarianceConfig, SampleCovarianceEstimator,
};
pub use error::{AnalyticsError, Result};
pub use linalg::LuDecomposition;
pub use metrics::{MetricsRecord, MetricsRow, MetricsTable, return_metrics, series_metrics};
pub use performance::{PORTFOLIO_NAME, performance_metrics, portfolio_returns};
pub use tangency::{
    Normalization, ReturnBasis, TangencyPortfolio, WeightVector, normalize_weights,
    tangency_sharpe, tangency_weights,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
