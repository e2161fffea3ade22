//! Annualized return metrics.
//!
//! For a column of periodic returns and `adj` periods per year:
//!
//! - `mean = mean(r) * adj`
//! - `vol = stdev(r) * sqrt(adj)` (sample standard deviation)
//! - `sharpe = mean / vol`
//!
//! A column with zero volatility yields a non-finite Sharpe ratio rather
//! than an error.

use crate::{
    annualization::Annualization,
    error::{AnalyticsError, Result},
    stats,
};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tangent_data::{ReturnSeries, ReturnTable};
use tracing::debug;

/// Annualized summary of one return column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Annualized mean return
    pub mean: f64,
    /// Annualized volatility
    pub vol: f64,
    /// Annualized Sharpe ratio (`mean / vol`)
    pub sharpe: f64,
}

impl MetricsRecord {
    /// Compute the record for a column of periodic returns.
    pub fn from_returns(values: ArrayView1<'_, f64>, adj: Annualization) -> Result<Self> {
        check_annualization(adj)?;
        let mean = stats::mean(values)? * adj.mean_scale();
        let vol = stats::sample_std(values)? * adj.volatility_scale();
        Ok(Self {
            mean,
            vol,
            sharpe: mean / vol,
        })
    }

    /// Whether all three statistics are finite.
    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.vol.is_finite() && self.sharpe.is_finite()
    }
}

/// A named row of a metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    /// Asset or portfolio name
    pub name: String,
    /// Annualized statistics
    #[serde(flatten)]
    pub metrics: MetricsRecord,
}

/// Metrics keyed by asset or portfolio name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsTable {
    rows: Vec<MetricsRow>,
}

impl MetricsTable {
    /// Empty table.
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append a row. A row with the same name is replaced in place.
    pub fn insert(&mut self, name: impl Into<String>, metrics: MetricsRecord) {
        let name = name.into();
        match self.rows.iter_mut().find(|row| row.name == name) {
            Some(row) => row.metrics = metrics,
            None => self.rows.push(MetricsRow { name, metrics }),
        }
    }

    /// Look up a row by name.
    pub fn get(&self, name: &str) -> Option<&MetricsRecord> {
        self.rows
            .iter()
            .find(|row| row.name == name)
            .map(|row| &row.metrics)
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    /// Row names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.name.as_str()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append all rows of `other`.
    pub fn extend(&mut self, other: Self) {
        for row in other.rows {
            self.insert(row.name, row.metrics);
        }
    }

    /// Iterate over `(name, metrics)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricsRecord)> {
        self.rows.iter().map(|row| (row.name.as_str(), &row.metrics))
    }
}

/// Annualized mean, volatility and Sharpe ratio for every column of a table.
///
/// Rows follow the table's column order.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use ndarray::array;
/// use tangent_analytics::{Annualization, return_metrics};
/// use tangent_data::ReturnTable;
///
/// let dates = (1..=3)
///     .map(|m| NaiveDate::from_ymd_opt(2024, m, 28).unwrap())
///     .collect();
/// let table = ReturnTable::new(
///     dates,
///     vec!["A".into(), "B".into()],
///     array![[0.01, 0.00], [0.02, 0.01], [-0.01, 0.01]],
/// )
/// .unwrap();
///
/// let metrics = return_metrics(&table, Annualization::Monthly).unwrap();
/// assert!((metrics.get("A").unwrap().mean - 0.08).abs() < 1e-12);
/// ```
pub fn return_metrics(table: &ReturnTable, adj: Annualization) -> Result<MetricsTable> {
    check_annualization(adj)?;
    let mut out = MetricsTable::new();
    for (i, asset) in table.assets().iter().enumerate() {
        let record = MetricsRecord::from_returns(table.values().column(i), adj)?;
        debug!(
            asset = %asset,
            mean = record.mean,
            vol = record.vol,
            sharpe = record.sharpe,
            "return metrics"
        );
        out.insert(asset.clone(), record);
    }
    Ok(out)
}

/// Annualized metrics for a single series.
pub fn series_metrics(series: &ReturnSeries, adj: Annualization) -> Result<MetricsRecord> {
    MetricsRecord::from_returns(series.values().view(), adj)
}

fn check_annualization(adj: Annualization) -> Result<()> {
    if adj.is_valid() {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidParameter(format!(
            "annualization factor must be finite and positive, got {}",
            adj.periods_per_year()
        )))
    }
}
