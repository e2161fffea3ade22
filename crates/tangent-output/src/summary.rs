//! Terminal and Markdown summaries.
//!
//! Summaries are plain owned snapshots of analytics and backtest results, so
//! they can be serialized into reports as well as rendered.

use serde::{Deserialize, Serialize};
use std::fmt;
use tangent_analytics::{
    Annualization, MetricsRow, MetricsTable, Normalization, TangencyPortfolio, WeightVector,
};
use tangent_backtest::{BacktestMetrics, BacktestResult};
use tangent_trading::{Acknowledgement, BookDepth, ExecutionReport, PnlSummary};

const WIDTH: usize = 72;

fn rule(output: &mut String, ch: &str) {
    output.push_str(&ch.repeat(WIDTH));
    output.push('\n');
}

/// Format a ratio as a percentage, keeping non-finite values readable.
fn pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn num(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        "n/a".to_string()
    }
}

/// Annualized metrics for a set of assets or portfolios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    /// Table title.
    pub title: String,

    /// Annualization applied to the metrics.
    pub annualization: Annualization,

    /// Rows in display order.
    pub rows: Vec<MetricsRow>,
}

impl MetricsSummary {
    /// Snapshot a metrics table.
    pub fn new(title: impl Into<String>, annualization: Annualization, table: &MetricsTable) -> Self {
        Self {
            title: title.into(),
            annualization,
            rows: table.rows().to_vec(),
        }
    }

    /// Row with the highest finite Sharpe ratio.
    pub fn best_sharpe(&self) -> Option<&MetricsRow> {
        self.rows
            .iter()
            .filter(|r| r.metrics.sharpe.is_finite())
            .max_by(|a, b| a.metrics.sharpe.total_cmp(&b.metrics.sharpe))
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", self.title));
        output.push_str(&format!("Annualization: {}\n", self.annualization));
        rule(&mut output, "=");
        output.push_str(&format!(
            "{:<24} {:>14} {:>14} {:>14}\n",
            "Name", "Mean", "Volatility", "Sharpe"
        ));
        rule(&mut output, "-");

        for row in &self.rows {
            output.push_str(&format!(
                "{:<24} {:>14} {:>14} {:>14}\n",
                row.name,
                pct(row.metrics.mean),
                pct(row.metrics.vol),
                num(row.metrics.sharpe, 4)
            ));
        }

        rule(&mut output, "=");
        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("## {}\n\n", self.title));
        output.push_str(&format!("**Annualization:** {}\n\n", self.annualization));
        output.push_str("| Name | Mean | Volatility | Sharpe |\n");
        output.push_str("|------|------|------------|--------|\n");
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                row.name,
                pct(row.metrics.mean),
                pct(row.metrics.vol),
                num(row.metrics.sharpe, 4)
            ));
        }
        output.push('\n');

        output
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.title, self.annualization)?;
        for row in &self.rows {
            writeln!(
                f,
                "  {}: mean {}, vol {}, sharpe {}",
                row.name,
                pct(row.metrics.mean),
                pct(row.metrics.vol),
                num(row.metrics.sharpe, 4)
            )?;
        }
        Ok(())
    }
}

/// One asset's weight in raw and normalized form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightRow {
    /// Asset ticker.
    pub asset: String,

    /// Raw `Σ⁻¹μ` weight.
    pub weight: f64,

    /// Weight rescaled to sum to one, when the raw sum allows it.
    pub normalized: Option<f64>,
}

/// Tangency portfolio weights and ex-ante statistics (per period).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightsSummary {
    /// Table title.
    pub title: String,

    /// Per-asset weights.
    pub rows: Vec<WeightRow>,

    /// Sum of raw weights.
    pub weight_sum: f64,

    /// Expected excess return of the raw weights.
    pub expected_return: f64,

    /// Volatility of the raw weights.
    pub volatility: f64,

    /// Ex-ante Sharpe ratio of the tangency portfolio.
    pub sharpe: f64,
}

impl WeightsSummary {
    /// Snapshot a tangency portfolio.
    ///
    /// `normalized` is `None` for every row when the weights cannot be
    /// rescaled (raw sum at or near zero).
    pub fn new(title: impl Into<String>, portfolio: &TangencyPortfolio) -> Self {
        let weights = portfolio.weights();
        let normalized = portfolio.normalized(Normalization::SumToOne).ok();
        Self {
            title: title.into(),
            rows: rows(weights, normalized.as_ref()),
            weight_sum: weights.sum(),
            expected_return: portfolio.expected_return(),
            volatility: portfolio.volatility(),
            sharpe: portfolio.sharpe(),
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", self.title));
        rule(&mut output, "=");
        output.push_str(&format!(
            "{:<24} {:>20} {:>20}\n",
            "Asset", "Weight", "Normalized"
        ));
        rule(&mut output, "-");
        for row in &self.rows {
            output.push_str(&format!(
                "{:<24} {:>20.6} {:>20}\n",
                row.asset,
                row.weight,
                row.normalized.map_or_else(|| "n/a".to_string(), |w| format!("{w:.6}"))
            ));
        }
        rule(&mut output, "-");
        output.push_str(&format!("  Sum of weights:     {:.6}\n", self.weight_sum));
        output.push_str(&format!("  Expected return:    {}\n", num(self.expected_return, 6)));
        output.push_str(&format!("  Volatility:         {}\n", num(self.volatility, 6)));
        output.push_str(&format!("  Sharpe (per period): {}\n", num(self.sharpe, 4)));
        rule(&mut output, "=");

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("## {}\n\n", self.title));
        output.push_str("| Asset | Weight | Normalized |\n");
        output.push_str("|-------|--------|------------|\n");
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {:.6} | {} |\n",
                row.asset,
                row.weight,
                row.normalized.map_or_else(|| "n/a".to_string(), |w| format!("{w:.6}"))
            ));
        }
        output.push_str(&format!(
            "\n- **Sum of weights:** {:.6}\n- **Sharpe (per period):** {}\n\n",
            self.weight_sum,
            num(self.sharpe, 4)
        ));

        output
    }
}

fn rows(weights: &WeightVector, normalized: Option<&WeightVector>) -> Vec<WeightRow> {
    weights
        .iter()
        .map(|(asset, weight)| WeightRow {
            asset: asset.to_string(),
            weight,
            normalized: normalized.and_then(|n| n.get(asset)),
        })
        .collect()
}

/// Headline numbers of a strategy run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSummary {
    /// Strategy name.
    pub strategy: String,

    /// Number of signal changes acted on.
    pub signals: usize,

    /// Run statistics.
    pub metrics: BacktestMetrics,

    /// Final P&L snapshot.
    pub pnl: PnlSummary,
}

impl From<&BacktestResult> for BacktestSummary {
    fn from(result: &BacktestResult) -> Self {
        Self {
            strategy: result.strategy.clone(),
            signals: result.signals.len(),
            metrics: result.metrics,
            pnl: result.pnl.clone(),
        }
    }
}

impl BacktestSummary {
    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nBacktest: {}\n", self.strategy));
        rule(&mut output, "=");
        output.push_str(&format!("  Signals:            {}\n", self.signals));
        output.push_str(&format!("  Trades:             {}\n", self.metrics.num_trades));
        output.push_str(&format!("  Total return:       {}\n", pct(self.metrics.total_return)));
        output.push_str(&format!("  Max drawdown:       {}\n", pct(self.metrics.max_drawdown)));
        output.push_str(&format!("  Sharpe ratio:       {:.4}\n", self.metrics.sharpe_ratio));
        rule(&mut output, "-");
        output.push_str(&format!("  Realized P&L:       {:.2}\n", self.pnl.realized_pnl));
        output.push_str(&format!("  Unrealized P&L:     {:.2}\n", self.pnl.unrealized_pnl));
        output.push_str(&format!("  Cash:               {:.2}\n", self.pnl.current_cash));
        for (symbol, qty) in &self.pnl.positions {
            output.push_str(&format!("  Position {symbol:<10} {qty}\n"));
        }
        rule(&mut output, "=");

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("## Backtest: {}\n\n", self.strategy));
        output.push_str("| Metric | Value |\n|--------|-------|\n");
        output.push_str(&format!("| Signals | {} |\n", self.signals));
        output.push_str(&format!("| Trades | {} |\n", self.metrics.num_trades));
        output.push_str(&format!("| Total return | {} |\n", pct(self.metrics.total_return)));
        output.push_str(&format!("| Max drawdown | {} |\n", pct(self.metrics.max_drawdown)));
        output.push_str(&format!("| Sharpe ratio | {:.4} |\n", self.metrics.sharpe_ratio));
        output.push_str(&format!("| Total P&L | {:.2} |\n\n", self.pnl.total_pnl));

        output
    }
}

/// Fills, resting depth and P&L after replaying orders through a book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSummary {
    /// Symbol the book trades.
    pub symbol: String,

    /// Every execution report, both sides of each match, in request order.
    pub fills: Vec<ExecutionReport>,

    /// Top levels left resting.
    pub depth: BookDepth,

    /// P&L of the booked fills.
    pub pnl: PnlSummary,
}

impl BookSummary {
    /// Collect the fills of a sequence of acknowledgements.
    pub fn new(
        symbol: impl Into<String>,
        acks: &[Acknowledgement],
        depth: BookDepth,
        pnl: PnlSummary,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            fills: acks.iter().flat_map(|ack| ack.reports.iter().cloned()).collect(),
            depth,
            pnl,
        }
    }

    fn depth_rows(&self) -> impl Iterator<Item = [String; 4]> + '_ {
        let levels = self.depth.bids.len().max(self.depth.asks.len());
        (0..levels).map(|i| {
            let bid = self.depth.bids.get(i);
            let ask = self.depth.asks.get(i);
            [
                bid.map(|l| l.quantity.to_string()).unwrap_or_default(),
                bid.map(|l| format!("{:.4}", l.price)).unwrap_or_default(),
                ask.map(|l| format!("{:.4}", l.price)).unwrap_or_default(),
                ask.map(|l| l.quantity.to_string()).unwrap_or_default(),
            ]
        })
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nOrder book: {}\n", self.symbol));
        rule(&mut output, "=");
        output.push_str(&format!(
            "{:<10} {:<16} {:<5} {:>10} {:>12} {:>14}\n",
            "Time", "Order", "Side", "Qty", "Price", "Status"
        ));
        rule(&mut output, "-");
        for fill in &self.fills {
            output.push_str(&format!(
                "{:<10} {:<16} {:<5} {:>10} {:>12.4} {:>14}\n",
                fill.timestamp.format("%H:%M:%S"),
                fill.order_id,
                fill.side,
                fill.filled_qty,
                fill.price,
                fill.status
            ));
        }
        rule(&mut output, "-");
        output.push_str(&format!(
            "{:>12} {:>12} {:>12} {:>12}\n",
            "Bid qty", "Bid", "Ask", "Ask qty"
        ));
        for [bid_qty, bid, ask, ask_qty] in self.depth_rows() {
            output.push_str(&format!("{bid_qty:>12} {bid:>12} {ask:>12} {ask_qty:>12}\n"));
        }
        rule(&mut output, "-");
        output.push_str(&format!("  Realized P&L:       {:.2}\n", self.pnl.realized_pnl));
        output.push_str(&format!("  Unrealized P&L:     {:.2}\n", self.pnl.unrealized_pnl));
        output.push_str(&format!("  Total P&L:          {:.2}\n", self.pnl.total_pnl));
        output.push_str(&format!("  Cash:               {:.2}\n", self.pnl.current_cash));
        for (symbol, qty) in &self.pnl.positions {
            output.push_str(&format!("  Position {symbol:<10} {qty}\n"));
        }
        rule(&mut output, "=");

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("## Order book: {}\n\n", self.symbol));
        output.push_str("### Fills\n\n");
        output.push_str("| Time | Order | Side | Qty | Price | Status |\n");
        output.push_str("|------|-------|------|-----|-------|--------|\n");
        for fill in &self.fills {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {:.4} | {} |\n",
                fill.timestamp.format("%H:%M:%S"),
                fill.order_id,
                fill.side,
                fill.filled_qty,
                fill.price,
                fill.status
            ));
        }

        output.push_str("\n### Depth\n\n");
        output.push_str("| Bid qty | Bid | Ask | Ask qty |\n");
        output.push_str("|---------|-----|-----|---------|\n");
        for [bid_qty, bid, ask, ask_qty] in self.depth_rows() {
            output.push_str(&format!("| {bid_qty} | {bid} | {ask} | {ask_qty} |\n"));
        }

        output.push_str("\n### P&L\n\n");
        output.push_str("| Metric | Value |\n|--------|-------|\n");
        output.push_str(&format!("| Realized | {:.2} |\n", self.pnl.realized_pnl));
        output.push_str(&format!("| Unrealized | {:.2} |\n", self.pnl.unrealized_pnl));
        output.push_str(&format!("| Total | {:.2} |\n", self.pnl.total_pnl));
        output.push_str(&format!("| Cash | {:.2} |\n", self.pnl.current_cash));
        for (symbol, qty) in &self.pnl.positions {
            output.push_str(&format!("| Position {symbol} | {qty} |\n"));
        }
        output.push('\n');

        output
    }
}
