//! Positions, cash and P&L from execution reports.
//!
//! Realized P&L uses average-cost accounting: fills that add to a position
//! update its average cost, fills that reduce it realize
//! `closed_qty * (price - average_cost)` (sign-adjusted for shorts).

use crate::order::{ExecutionReport, Side};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Column names of the blotter frame.
pub const BLOTTER_COLUMNS: [&str; 6] = ["timestamp", "symbol", "side", "quantity", "price", "cash_flow"];

/// Net holding in one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Signed quantity (negative when short)
    pub quantity: i64,
    /// Average entry price of the open quantity
    pub average_cost: f64,
    /// P&L realized on closed quantity
    pub realized_pnl: f64,
}

impl Position {
    fn apply(&mut self, side: Side, qty: u64, price: f64) {
        let delta = side.sign() * qty as i64;
        let opening = self.quantity == 0 || self.quantity.signum() == delta.signum();

        if opening {
            let held = self.quantity.unsigned_abs() as f64;
            self.average_cost = (held * self.average_cost + qty as f64 * price) / (held + qty as f64);
            self.quantity += delta;
            return;
        }

        let closed = qty.min(self.quantity.unsigned_abs());
        self.realized_pnl +=
            closed as f64 * (price - self.average_cost) * self.quantity.signum() as f64;
        self.quantity += delta;

        if self.quantity == 0 {
            self.average_cost = 0.0;
        } else if self.quantity.signum() == delta.signum() {
            // Flipped through flat: the excess opens at the fill price
            self.average_cost = price;
        }
    }

    /// Mark-to-market P&L of the open quantity.
    pub fn unrealized_pnl(&self, mark: f64) -> f64 {
        self.quantity as f64 * (mark - self.average_cost)
    }
}

/// One recorded fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlotterEntry {
    /// Fill time
    pub timestamp: DateTime<Utc>,
    /// Instrument symbol
    pub symbol: String,
    /// Direction
    pub side: Side,
    /// Filled quantity
    pub quantity: u64,
    /// Fill price
    pub price: f64,
    /// Cash impact (negative for buys)
    pub cash_flow: f64,
}

/// P&L snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    /// P&L on closed quantity
    pub realized_pnl: f64,
    /// Mark-to-market P&L on open quantity
    pub unrealized_pnl: f64,
    /// Realized plus unrealized
    pub total_pnl: f64,
    /// Cash balance
    pub current_cash: f64,
    /// Net quantity per symbol
    pub positions: BTreeMap<String, i64>,
}

/// Tracks positions and cash, and records every fill.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    positions: BTreeMap<String, Position>,
    cash: f64,
    starting_cash: f64,
    blotter: Vec<BlotterEntry>,
}

impl PositionTracker {
    /// Tracker with an initial cash balance.
    pub fn new(starting_cash: f64) -> Self {
        Self {
            cash: starting_cash,
            starting_cash,
            ..Default::default()
        }
    }

    /// Apply one execution report.
    pub fn update(&mut self, report: &ExecutionReport) {
        let cash_flow = report.cash_flow();
        self.cash += cash_flow;
        self.positions.entry(report.symbol.clone()).or_default().apply(
            report.side,
            report.filled_qty,
            report.price,
        );
        self.blotter.push(BlotterEntry {
            timestamp: report.timestamp,
            symbol: report.symbol.clone(),
            side: report.side,
            quantity: report.filled_qty,
            price: report.price,
            cash_flow,
        });
        debug!(
            symbol = %report.symbol,
            side = %report.side,
            qty = report.filled_qty,
            price = report.price,
            cash = self.cash,
            "position updated"
        );
    }

    /// Cash balance.
    pub const fn cash(&self) -> f64 {
        self.cash
    }

    /// Initial cash balance.
    pub const fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    /// Net quantity in `symbol` (zero if never traded).
    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).map_or(0, |p| p.quantity)
    }

    /// Full position state per symbol.
    pub const fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Recorded fills, oldest first.
    pub fn blotter(&self) -> &[BlotterEntry] {
        &self.blotter
    }

    /// Sum of realized P&L across symbols.
    pub fn realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Cash plus open positions valued at `marks`.
    ///
    /// Symbols without a mark are valued at their average cost.
    pub fn equity(&self, marks: &HashMap<String, f64>) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .map(|(symbol, p)| {
                    let mark = marks.get(symbol).copied().unwrap_or(p.average_cost);
                    p.quantity as f64 * mark
                })
                .sum::<f64>()
    }

    /// Realized and unrealized P&L at the given marks.
    ///
    /// Open positions without a mark contribute no unrealized P&L.
    pub fn pnl_summary(&self, marks: &HashMap<String, f64>) -> PnlSummary {
        let realized_pnl = self.realized_pnl();
        let mut unrealized_pnl = 0.0;

        for (symbol, position) in &self.positions {
            if position.quantity == 0 {
                continue;
            }
            match marks.get(symbol) {
                Some(&mark) => unrealized_pnl += position.unrealized_pnl(mark),
                None => warn!(
                    symbol = %symbol,
                    quantity = position.quantity,
                    "no mark for open position, unrealized P&L taken as zero"
                ),
            }
        }

        PnlSummary {
            realized_pnl,
            unrealized_pnl,
            total_pnl: realized_pnl + unrealized_pnl,
            current_cash: self.cash,
            positions: self
                .positions
                .iter()
                .map(|(symbol, p)| (symbol.clone(), p.quantity))
                .collect(),
        }
    }

    /// Blotter as a polars frame with [`BLOTTER_COLUMNS`].
    ///
    /// An empty blotter gives an empty frame with the same schema.
    pub fn blotter_frame(&self) -> PolarsResult<DataFrame> {
        let timestamps: Vec<_> = self.blotter.iter().map(|e| e.timestamp.naive_utc()).collect();
        let symbols: Vec<&str> = self.blotter.iter().map(|e| e.symbol.as_str()).collect();
        let sides: Vec<String> = self.blotter.iter().map(|e| e.side.to_string()).collect();
        let quantities: Vec<u64> = self.blotter.iter().map(|e| e.quantity).collect();
        let prices: Vec<f64> = self.blotter.iter().map(|e| e.price).collect();
        let cash_flows: Vec<f64> = self.blotter.iter().map(|e| e.cash_flow).collect();

        DataFrame::new(vec![
            Column::new(BLOTTER_COLUMNS[0].into(), timestamps),
            Column::new(BLOTTER_COLUMNS[1].into(), symbols),
            Column::new(BLOTTER_COLUMNS[2].into(), sides),
            Column::new(BLOTTER_COLUMNS[3].into(), quantities),
            Column::new(BLOTTER_COLUMNS[4].into(), prices),
            Column::new(BLOTTER_COLUMNS[5].into(), cash_flows),
        ])
    }
}
