#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod indicators;
pub mod signal;
pub mod strategies;

pub use engine::{
    BacktestConfig, BacktestMetrics, BacktestResult, RiskParams, max_drawdown, sharpe_ratio,
};
pub use error::{BacktestError, Result};
pub use indicators::{BollingerBands, moving_average, ols_slope, rolling_mean_std, rolling_zscore};
pub use signal::{Direction, SignalEvent};
pub use strategies::{
    AlignedPair, MeanReversion, MeanReversionConfig, PairsArbitrage, PairsConfig, Strategy,
    TrendFollowing, TrendFollowingConfig,
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
