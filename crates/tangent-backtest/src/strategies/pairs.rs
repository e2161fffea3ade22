//! Two-asset spread trading.
//!
//! The spread is `p1 - beta * p2` with `beta` estimated by OLS over the whole
//! aligned sample. The spread is normalized with a rolling z-score:
//!
//! - `z > threshold` opens short spread (sell asset 1, buy asset 2)
//! - `z < -threshold` opens long spread (buy asset 1, sell asset 2)
//! - `|z| <= threshold / 2` closes both legs
//!
//! Between those zones the previous state is held.

use super::{Strategy, check_series};
use crate::{
    engine::{BacktestConfig, BacktestResult, Simulator},
    error::{BacktestError, Result},
    indicators::{ols_slope, rolling_zscore},
    signal::{Direction, SignalEvent},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tangent_data::PriceHistory;
use tracing::{debug, info};

/// Configuration for [`PairsArbitrage`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairsConfig {
    /// Entry threshold in spread z-score units (default: 2.0)
    pub threshold: f64,
    /// Rolling z-score window (default: 20)
    pub zscore_window: usize,
    /// Minimum observations before the z-score is defined (default: 10)
    pub min_periods: usize,
    /// Beta falls back to 1 unless there are more aligned points than this (default: 10)
    pub min_points_for_beta: usize,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            zscore_window: 20,
            min_periods: 10,
            min_points_for_beta: 10,
        }
    }
}

/// Pairs arbitrage over two price histories.
#[derive(Debug, Clone, Default)]
pub struct PairsArbitrage {
    config: PairsConfig,
}

/// Two histories restricted to their common timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    /// Common timestamps, ascending
    pub timestamps: Vec<DateTime<Utc>>,
    /// Asset 1 closes
    pub first: Vec<f64>,
    /// Asset 2 closes
    pub second: Vec<f64>,
}

impl AlignedPair {
    /// Intersect two histories on timestamp.
    pub fn align(first: &PriceHistory, second: &PriceHistory) -> Self {
        let lookup: HashMap<DateTime<Utc>, f64> = second
            .bars()
            .iter()
            .map(|b| (b.timestamp, b.close))
            .collect();

        let mut aligned = Self {
            timestamps: Vec::new(),
            first: Vec::new(),
            second: Vec::new(),
        };
        for bar in first.bars() {
            if let Some(&p2) = lookup.get(&bar.timestamp) {
                aligned.timestamps.push(bar.timestamp);
                aligned.first.push(bar.close);
                aligned.second.push(p2);
            }
        }
        aligned
    }

    /// Number of aligned points.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when the histories share no timestamps.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

impl PairsArbitrage {
    /// Create the strategy.
    pub fn new(config: PairsConfig) -> Result<Self> {
        if !config.threshold.is_finite() || config.threshold <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "threshold must be positive, got {}",
                config.threshold
            )));
        }
        Ok(Self { config })
    }

    /// Strategy configuration.
    pub const fn config(&self) -> &PairsConfig {
        &self.config
    }

    /// Hedge ratio of asset 1 on asset 2.
    pub fn hedge_ratio(&self, pair: &AlignedPair) -> f64 {
        if pair.len() > self.config.min_points_for_beta {
            ols_slope(&pair.first, &pair.second).unwrap_or(1.0)
        } else {
            1.0
        }
    }

    fn next_state(&self, previous: Direction, z: Option<f64>) -> Direction {
        let Some(z) = z else {
            return previous;
        };
        let threshold = self.config.threshold;
        if z > threshold {
            Direction::Short
        } else if z < -threshold {
            Direction::Long
        } else if z.abs() <= threshold / 2.0 {
            Direction::Flat
        } else {
            previous
        }
    }
}

impl Strategy for PairsArbitrage {
    fn name(&self) -> &'static str {
        "pairs_arbitrage"
    }

    fn required_series(&self) -> usize {
        2
    }

    fn run(&self, prices: &[PriceHistory], config: &BacktestConfig) -> Result<BacktestResult> {
        check_series(self, prices)?;
        let (first, second) = (&prices[0], &prices[1]);
        let pair = AlignedPair::align(first, second);
        if pair.len() < self.config.min_periods {
            return Err(BacktestError::InsufficientData {
                required: self.config.min_periods,
                actual: pair.len(),
            });
        }

        let beta = self.hedge_ratio(&pair);
        let spread: Vec<f64> = pair
            .first
            .iter()
            .zip(&pair.second)
            .map(|(p1, p2)| p1 - beta * p2)
            .collect();
        let zscore = rolling_zscore(&spread, self.config.zscore_window, self.config.min_periods)?;
        debug!(
            first = first.symbol(),
            second = second.symbol(),
            points = pair.len(),
            beta,
            "aligned pair"
        );

        let mut sim = Simulator::new("ARB", *config)?;
        let max = sim.max_position();
        let hedge = (beta * max as f64).trunc() as i64;
        let mut signals = Vec::new();
        let mut state = Direction::Flat;
        let mut marks = HashMap::new();

        for i in 0..pair.len() {
            let (ts, p1, p2) = (pair.timestamps[i], pair.first[i], pair.second[i]);
            let next = self.next_state(state, zscore[i]);

            if next != state {
                let exposure = next.as_i64();
                sim.trade_to(first.symbol(), exposure * max, p1, ts)?;
                sim.trade_to(second.symbol(), -exposure * hedge, p2, ts)?;

                let mut event = SignalEvent::new(ts, next, p1)
                    .with("p2", p2)
                    .with("spread", spread[i])
                    .with("beta", beta);
                if let Some(z) = zscore[i] {
                    event = event.with("zscore", z);
                }
                signals.push(event);
                state = next;
            }

            marks.insert(first.symbol().to_string(), p1);
            marks.insert(second.symbol().to_string(), p2);
            sim.mark(&marks);
        }

        let result = sim.finish(self.name(), signals, &marks);
        info!(
            strategy = self.name(),
            first = first.symbol(),
            second = second.symbol(),
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
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn history(symbol: &str, days: impl Iterator<Item = (i64, f64)>) -> PriceHistory {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap();
        PriceHistory::from_closes(
            symbol,
            days.map(|(d, p)| (start + Duration::days(d), p)),
        )
        .unwrap()
    }

    #[test]
    fn test_align_intersects_timestamps() {
        let a = history("A", (0..5).map(|d| (d, 10.0 + d as f64)));
        let b = history("B", [(1, 20.0), (3, 22.0), (7, 30.0)].into_iter());
        let pair = AlignedPair::align(&a, &b);
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.first, vec![11.0, 13.0]);
        assert_eq!(pair.second, vec![20.0, 22.0]);
    }

    #[test]
    fn test_hedge_ratio_fallback() {
        let strategy = PairsArbitrage::default();
        let short = AlignedPair::align(
            &history("A", (0..10).map(|d| (d, 2.0 * d as f64))),
            &history("B", (0..10).map(|d| (d, d as f64))),
        );
        assert_eq!(strategy.hedge_ratio(&short), 1.0);

        let long = AlignedPair::align(
            &history("A", (0..11).map(|d| (d, 2.0 * d as f64))),
            &history("B", (0..11).map(|d| (d, d as f64))),
        );
        assert_relative_eq!(strategy.hedge_ratio(&long), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_state_hysteresis() {
        let strategy = PairsArbitrage::default();
        assert_eq!(strategy.next_state(Direction::Flat, Some(2.5)), Direction::Short);
        assert_eq!(strategy.next_state(Direction::Short, Some(1.5)), Direction::Short);
        assert_eq!(strategy.next_state(Direction::Short, Some(0.5)), Direction::Flat);
        assert_eq!(strategy.next_state(Direction::Long, None), Direction::Long);
        assert_eq!(strategy.next_state(Direction::Flat, Some(-2.1)), Direction::Long);
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        assert!(
            PairsArbitrage::new(PairsConfig {
                threshold: 0.0,
                ..Default::default()
            })
            .is_err()
        );
    }
}
