//! Order execution, equity tracking and result metrics shared by all strategies.

use crate::{
    error::{BacktestError, Result},
    signal::SignalEvent,
};
use chrono::{DateTime, Utc};
use ndarray::ArrayView1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tangent_analytics::stats;
use tangent_trading::{
    ExecutionReport, Order, OrderManagementSystem, PnlSummary, PositionTracker, Side,
};
use tracing::debug;

/// Position sizing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Maximum absolute position per instrument, also the size of one trade
    pub max_position: u64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self { max_position: 100 }
    }
}

/// Settings shared by every strategy run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial cash balance
    pub starting_cash: f64,
    /// Position sizing
    pub risk: RiskParams,
    /// Periods per year used to annualize the Sharpe ratio
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            risk: RiskParams::default(),
            periods_per_year: 252.0,
        }
    }
}

impl BacktestConfig {
    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.starting_cash.is_finite() || self.starting_cash <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "starting cash must be positive, got {}",
                self.starting_cash
            )));
        }
        if self.risk.max_position == 0 {
            return Err(BacktestError::InvalidParameter(
                "max_position must be greater than 0".to_string(),
            ));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "periods_per_year must be positive, got {}",
                self.periods_per_year
            )));
        }
        Ok(())
    }
}

/// Summary statistics of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    /// Total P&L divided by starting cash
    pub total_return: f64,
    /// Largest peak-to-trough decline of the equity curve, as a fraction (<= 0)
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio of per-step equity returns (0 when undefined)
    pub sharpe_ratio: f64,
    /// Number of fills
    pub num_trades: usize,
}

impl BacktestMetrics {
    /// Compute metrics from an equity curve whose first point is the starting cash.
    pub fn from_equity_curve(
        equity: &[f64],
        total_pnl: f64,
        starting_cash: f64,
        periods_per_year: f64,
        num_trades: usize,
    ) -> Self {
        Self {
            total_return: total_pnl / starting_cash,
            max_drawdown: max_drawdown(equity),
            sharpe_ratio: sharpe_ratio(equity, periods_per_year),
            num_trades,
        }
    }
}

/// Most negative `(equity - running_max) / running_max`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst
}

/// Annualized Sharpe ratio of simple step returns; 0 when volatility is zero
/// or there are fewer than two returns.
pub fn sharpe_ratio(equity: &[f64], periods_per_year: f64) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    let returns = ArrayView1::from(returns.as_slice());
    // A flat or short equity curve scores 0 instead of an undefined ratio
    match (stats::mean(returns), stats::sample_std(returns)) {
        (Ok(mean), Ok(std)) if std > 0.0 => mean / std * periods_per_year.sqrt(),
        _ => 0.0,
    }
}

/// Output of a strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Strategy name
    pub strategy: String,
    /// Signal changes acted on, in time order
    pub signals: Vec<SignalEvent>,
    /// Fills, in time order
    pub trades: Vec<ExecutionReport>,
    /// Marked equity after each bar, preceded by the starting cash
    pub equity_curve: Vec<f64>,
    /// Final P&L snapshot at the last prices
    pub pnl: PnlSummary,
    /// Summary statistics
    pub metrics: BacktestMetrics,
}

impl BacktestResult {
    /// Signals as a polars frame: `timestamp`, `signal` (+1/-1/0), `price`,
    /// then one column per indicator.
    pub fn signals_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![
            Column::new(
                "timestamp".into(),
                self.signals
                    .iter()
                    .map(|s| s.timestamp.naive_utc())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "signal".into(),
                self.signals
                    .iter()
                    .map(|s| s.direction.as_i64())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "price".into(),
                self.signals.iter().map(|s| s.price).collect::<Vec<_>>(),
            ),
        ];

        let mut names: Vec<&String> = self.signals.iter().flat_map(|s| s.indicators.keys()).collect();
        names.sort();
        names.dedup();
        for name in names {
            let values: Vec<Option<f64>> = self
                .signals
                .iter()
                .map(|s| s.indicators.get(name).copied())
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        DataFrame::new(columns)
    }
}

/// Sends orders through an OMS, fills them at the order price and books
/// the fills.
#[derive(Debug)]
pub(crate) struct Simulator {
    prefix: &'static str,
    config: BacktestConfig,
    oms: OrderManagementSystem,
    tracker: PositionTracker,
    trades: Vec<ExecutionReport>,
    equity: Vec<f64>,
    next_id: u64,
}

impl Simulator {
    pub(crate) fn new(prefix: &'static str, config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            prefix,
            config,
            oms: OrderManagementSystem::new(),
            tracker: PositionTracker::new(config.starting_cash),
            trades: Vec::new(),
            equity: vec![config.starting_cash],
            next_id: 0,
        })
    }

    pub(crate) const fn max_position(&self) -> i64 {
        self.config.risk.max_position as i64
    }

    pub(crate) fn position(&self, symbol: &str) -> i64 {
        self.tracker.position(symbol)
    }

    /// Trade `symbol` from its current position to `target`.
    pub(crate) fn trade_to(
        &mut self,
        symbol: &str,
        target: i64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let delta = target - self.position(symbol);
        if delta == 0 {
            return Ok(());
        }
        let side = if delta > 0 { Side::Buy } else { Side::Sell };
        self.execute(symbol, side, delta.unsigned_abs(), price, timestamp)
    }

    /// Move `max_position` in `side`'s direction, keeping the position
    /// within `[-max_position, max_position]`.
    pub(crate) fn step(
        &mut self,
        symbol: &str,
        side: Side,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let max = self.max_position();
        let target = (self.position(symbol) + side.sign() * max).clamp(-max, max);
        self.trade_to(symbol, target, price, timestamp)
    }

    fn execute(
        &mut self,
        symbol: &str,
        side: Side,
        quantity: u64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.next_id += 1;
        let order = Order::limit(
            format!("{}-{:06}", self.prefix, self.next_id),
            symbol,
            side,
            quantity,
            price,
            timestamp,
        );
        self.oms.new_order(order.clone())?;

        let report = ExecutionReport::for_fill(&order, quantity, quantity, price, timestamp);
        self.oms.apply_report(&report);
        self.tracker.update(&report);
        debug!(order_id = %report.order_id, %side, quantity, price, "backtest fill");
        self.trades.push(report);
        Ok(())
    }

    /// Record equity at the given marks.
    pub(crate) fn mark(&mut self, marks: &HashMap<String, f64>) {
        self.equity.push(self.tracker.equity(marks));
    }

    pub(crate) fn finish(
        self,
        strategy: &str,
        signals: Vec<SignalEvent>,
        final_marks: &HashMap<String, f64>,
    ) -> BacktestResult {
        let pnl = self.tracker.pnl_summary(final_marks);
        let metrics = BacktestMetrics::from_equity_curve(
            &self.equity,
            pnl.total_pnl,
            self.config.starting_cash,
            self.config.periods_per_year,
            self.trades.len(),
        );
        BacktestResult {
            strategy: strategy.to_string(),
            signals,
            trades: self.trades,
            equity_curve: self.equity,
            pnl,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    #[test]
    fn test_max_drawdown() {
        assert_eq!(max_drawdown(&[100.0, 110.0, 120.0]), 0.0);
        assert_relative_eq!(max_drawdown(&[100.0, 120.0, 90.0, 130.0]), -0.25);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0], 252.0), 0.0);
        assert_eq!(sharpe_ratio(&[100.0, 101.0], 252.0), 0.0);

        let equity = [100.0, 101.0, 100.5, 102.0];
        let r: Vec<f64> = equity.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let mean = r.iter().sum::<f64>() / 3.0;
        let std = (r.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 2.0).sqrt();
        assert_relative_eq!(
            sharpe_ratio(&equity, 252.0),
            mean / std * 252.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sharpe_ratio_agrees_with_analytics_stats() {
        // Zero equity bars carry no return and are skipped
        let equity = [0.0, 100.0, 98.0, 103.0, 101.0, 104.5];
        let returns = ndarray::array![
            98.0 / 100.0 - 1.0,
            103.0 / 98.0 - 1.0,
            101.0 / 103.0 - 1.0,
            104.5 / 101.0 - 1.0
        ];
        let expected = stats::mean(returns.view()).unwrap()
            / stats::sample_std(returns.view()).unwrap()
            * 12.0_f64.sqrt();
        assert_relative_eq!(sharpe_ratio(&equity, 12.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_config_validation() {
        assert!(BacktestConfig::default().validate().is_ok());
        let bad = BacktestConfig {
            risk: RiskParams { max_position: 0 },
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_simulator_clamps_to_max_position() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let mut sim = Simulator::new("T", BacktestConfig::default()).unwrap();
        sim.step("AAPL", Side::Buy, 10.0, ts).unwrap();
        sim.step("AAPL", Side::Buy, 10.0, ts).unwrap();
        assert_eq!(sim.position("AAPL"), 100);
        sim.step("AAPL", Side::Sell, 11.0, ts).unwrap();
        assert_eq!(sim.position("AAPL"), 0);
        assert_eq!(sim.trades.len(), 2);

        let marks = HashMap::from([("AAPL".to_string(), 11.0)]);
        sim.mark(&marks);
        let result = sim.finish("test", Vec::new(), &marks);
        assert_relative_eq!(result.pnl.realized_pnl, 100.0);
        assert_relative_eq!(result.metrics.total_return, 100.0 / 100_000.0);
        assert_eq!(result.equity_curve.len(), 2);
    }
}
