//! Strategy implementations.

pub mod mean_reversion;
pub mod pairs;
pub mod trend;

pub use mean_reversion::{MeanReversion, MeanReversionConfig};
pub use pairs::{AlignedPair, PairsArbitrage, PairsConfig};
pub use trend::{TrendFollowing, TrendFollowingConfig};

use crate::{
    engine::{BacktestConfig, BacktestResult},
    error::{BacktestError, Result},
};
use tangent_data::PriceHistory;

/// A rule-based strategy that can be replayed over price history.
pub trait Strategy {
    /// Short name used in logs, order ids and reports.
    fn name(&self) -> &'static str;

    /// Number of price series the strategy trades.
    fn required_series(&self) -> usize {
        1
    }

    /// Replay the strategy over `prices` (one history per traded instrument).
    fn run(&self, prices: &[PriceHistory], config: &BacktestConfig) -> Result<BacktestResult>;
}

pub(crate) fn check_series(strategy: &dyn Strategy, prices: &[PriceHistory]) -> Result<()> {
    if prices.len() != strategy.required_series() {
        return Err(BacktestError::SeriesCount {
            strategy: strategy.name(),
            expected: strategy.required_series(),
            actual: prices.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_length(history: &PriceHistory, required: usize) -> Result<()> {
    if history.len() < required {
        return Err(BacktestError::InsufficientData {
            required,
            actual: history.len(),
        });
    }
    Ok(())
}
