//! Moving-average crossover.
//!
//! Long while the short average is above the long average, short while it
//! is below. A trade is placed each time the signal changes to a non-zero
//! value.

use super::{Strategy, check_length, check_series};
use crate::{
    engine::{BacktestConfig, BacktestResult, Simulator},
    error::{BacktestError, Result},
    indicators::moving_average,
    signal::{Direction, SignalEvent},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tangent_data::PriceHistory;
use tracing::info;

/// Configuration for [`TrendFollowing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendFollowingConfig {
    /// Short moving-average window (default: 20)
    pub short_window: usize,
    /// Long moving-average window (default: 50)
    pub long_window: usize,
}

impl Default for TrendFollowingConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
        }
    }
}

/// Moving-average crossover strategy.
#[derive(Debug, Clone, Default)]
pub struct TrendFollowing {
    config: TrendFollowingConfig,
}

impl TrendFollowing {
    /// Create the strategy; the short window must be shorter than the long one.
    pub fn new(config: TrendFollowingConfig) -> Result<Self> {
        if config.short_window == 0 || config.short_window >= config.long_window {
            return Err(BacktestError::InvalidParameter(format!(
                "short window {} must be positive and below long window {}",
                config.short_window, config.long_window
            )));
        }
        Ok(Self { config })
    }

    /// Strategy configuration.
    pub const fn config(&self) -> &TrendFollowingConfig {
        &self.config
    }
}

impl Strategy for TrendFollowing {
    fn name(&self) -> &'static str {
        "trend_following"
    }

    fn run(&self, prices: &[PriceHistory], config: &BacktestConfig) -> Result<BacktestResult> {
        check_series(self, prices)?;
        let history = &prices[0];
        check_length(history, self.config.long_window)?;

        let symbol = history.symbol();
        let closes = history.closes();
        let short = moving_average(&closes, self.config.short_window)?;
        let long = moving_average(&closes, self.config.long_window)?;

        let mut sim = Simulator::new("TREND", *config)?;
        let mut signals = Vec::new();
        let mut previous = Direction::Flat;
        let mut marks = HashMap::new();

        for (i, bar) in history.bars().iter().enumerate() {
            let direction = match (short[i], long[i]) {
                (Some(s), Some(l)) if s > l => Direction::Long,
                (Some(s), Some(l)) if s < l => Direction::Short,
                _ => Direction::Flat,
            };

            if direction != previous {
                if let (Some(side), Some(s), Some(l)) = (direction.side(), short[i], long[i]) {
                    sim.step(symbol, side, bar.close, bar.timestamp)?;
                    signals.push(
                        SignalEvent::new(bar.timestamp, direction, bar.close)
                            .with("ma_short", s)
                            .with("ma_long", l),
                    );
                }
            }
            previous = direction;

            marks.insert(symbol.to_string(), bar.close);
            sim.mark(&marks);
        }

        let result = sim.finish(self.name(), signals, &marks);
        info!(
            strategy = self.name(),
            symbol,
            signals = result.signals.len(),
            trades = result.trades.len(),
            total_return = result.metrics.total_return,
            "backtest complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_windows() {
        assert!(
            TrendFollowing::new(TrendFollowingConfig {
                short_window: 50,
                long_window: 20
            })
            .is_err()
        );
        assert!(
            TrendFollowing::new(TrendFollowingConfig {
                short_window: 0,
                long_window: 20
            })
            .is_err()
        );
    }

    #[test]
    fn test_requires_one_series() {
        let strategy = TrendFollowing::default();
        assert!(matches!(
            strategy.run(&[], &BacktestConfig::default()),
            Err(BacktestError::SeriesCount { expected: 1, .. })
        ));
    }
}
