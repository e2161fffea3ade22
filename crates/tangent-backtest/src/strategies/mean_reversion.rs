//! Bollinger band mean reversion.

use super::{Strategy, check_length, check_series};
use crate::{
    engine::{BacktestConfig, BacktestResult, Simulator},
    error::Result,
    indicators::BollingerBands,
    signal::{Direction, SignalEvent},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tangent_data::PriceHistory;
use tracing::info;

/// Configuration for [`MeanReversion`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    /// Band window (default: 20)
    pub window: usize,
    /// Band width in standard deviations (default: 2.0)
    pub num_std: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            window: 20,
            num_std: 2.0,
        }
    }
}

/// Buys when the price crosses down through the lower band and sells when it
/// crosses up through the upper band.
///
/// A bar that also crosses the middle band produces no signal.
#[derive(Debug, Clone, Default)]
pub struct MeanReversion {
    config: MeanReversionConfig,
}

impl MeanReversion {
    /// Create the strategy.
    pub const fn new(config: MeanReversionConfig) -> Self {
        Self { config }
    }

    /// Strategy configuration.
    pub const fn config(&self) -> &MeanReversionConfig {
        &self.config
    }
}

/// Signal at bar `i` given the price and bands at `i - 1` and `i`.
fn band_signal(prev_price: f64, price: f64, prev: (f64, f64, f64), now: (f64, f64, f64)) -> Direction {
    let (prev_upper, prev_mid, prev_lower) = prev;
    let (upper, mid, lower) = now;

    let crossed_mid =
        (price >= mid && prev_price < prev_mid) || (price <= mid && prev_price > prev_mid);
    if crossed_mid {
        Direction::Flat
    } else if price >= upper && prev_price < prev_upper {
        Direction::Short
    } else if price <= lower && prev_price > prev_lower {
        Direction::Long
    } else {
        Direction::Flat
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn run(&self, prices: &[PriceHistory], config: &BacktestConfig) -> Result<BacktestResult> {
        check_series(self, prices)?;
        let history = &prices[0];
        check_length(history, self.config.window + 1)?;

        let symbol = history.symbol();
        let closes = history.closes();
        let bands = BollingerBands::compute(&closes, self.config.window, self.config.num_std)?;

        let mut sim = Simulator::new("MR", *config)?;
        let mut signals = Vec::new();
        let mut marks = HashMap::new();

        for (i, bar) in history.bars().iter().enumerate() {
            if i > 0 {
                if let (Some(prev), Some(now)) = (bands.at(i - 1), bands.at(i)) {
                    let direction = band_signal(closes[i - 1], bar.close, prev, now);
                    if let Some(side) = direction.side() {
                        sim.step(symbol, side, bar.close, bar.timestamp)?;
                        signals.push(
                            SignalEvent::new(bar.timestamp, direction, bar.close)
                                .with("upper", now.0)
                                .with("mid", now.1)
                                .with("lower", now.2),
                        );
                    }
                }
            }

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
    use rstest::rstest;

    const BANDS: (f64, f64, f64) = (110.0, 100.0, 90.0);

    #[rstest]
    #[case(95.0, 89.0, Direction::Long)]
    #[case(105.0, 111.0, Direction::Short)]
    #[case(89.0, 88.0, Direction::Flat)]
    #[case(95.0, 98.0, Direction::Flat)]
    // Jumps from above mid straight through the lower band
    #[case(101.0, 85.0, Direction::Flat)]
    fn test_band_signal(#[case] prev_price: f64, #[case] price: f64, #[case] expected: Direction) {
        assert_eq!(band_signal(prev_price, price, BANDS, BANDS), expected);
    }

    #[test]
    fn test_short_history_is_rejected() {
        let ts = chrono::Utc::now();
        let history = PriceHistory::from_closes(
            "AAPL",
            (0..5).map(|i| (ts + chrono::Duration::days(i), 100.0)),
        )
        .unwrap();
        assert!(
            MeanReversion::default()
                .run(&[history], &BacktestConfig::default())
                .is_err()
        );
    }
}
