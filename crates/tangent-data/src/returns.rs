//! Return tables and single return series.
//!
//! A [`ReturnTable`] is the in-memory form of a returns sheet: one row per
//! period in strictly increasing date order, one column per asset. Values are
//! periodic returns, either raw or in excess of a risk-free rate; the table
//! itself does not know which.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use polars::prelude::*;
use std::collections::HashSet;

/// Dated periodic returns for a set of uniquely named assets (T x N).
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    values: Array2<f64>,
}

impl ReturnTable {
    /// Create a validated return table.
    ///
    /// # Errors
    /// Fails when the value matrix does not match the label lengths, when an
    /// asset identifier repeats, when dates are not strictly increasing, or
    /// when there are no assets.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use ndarray::array;
    /// use tangent_data::ReturnTable;
    ///
    /// let dates = vec![
    ///     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    ///     NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
    /// ];
    /// let table = ReturnTable::new(
    ///     dates,
    ///     vec!["SPY".to_string(), "EFA".to_string()],
    ///     array![[0.01, 0.02], [-0.01, 0.00]],
    /// )
    /// .unwrap();
    /// assert_eq!(table.n_periods(), 2);
    /// assert_eq!(table.n_assets(), 2);
    /// ```
    pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if assets.is_empty() {
            return Err(DataError::Empty("return table has no asset columns".to_string()));
        }
        if rows != dates.len() {
            return Err(DataError::DimensionMismatch {
                expected: dates.len(),
                actual: rows,
            });
        }
        if cols != assets.len() {
            return Err(DataError::DimensionMismatch {
                expected: assets.len(),
                actual: cols,
            });
        }

        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(DataError::DuplicateAsset(asset.clone()));
            }
        }

        check_increasing(&dates)?;

        Ok(Self {
            dates,
            assets,
            values,
        })
    }

    /// Period dates, oldest first.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Asset identifiers in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Raw value matrix (rows = periods, columns = assets).
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of periods (rows).
    pub fn n_periods(&self) -> usize {
        self.values.nrows()
    }

    /// Number of assets (columns).
    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    /// Column position of an asset.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Returns of one asset.
    pub fn column(&self, asset: &str) -> Option<ArrayView1<'_, f64>> {
        self.asset_index(asset)
            .map(|idx| self.values.index_axis(Axis(1), idx))
    }

    /// Returns of one asset as a standalone series.
    pub fn series(&self, asset: &str) -> Result<ReturnSeries> {
        let column = self
            .column(asset)
            .ok_or_else(|| DataError::UnknownAsset(asset.to_string()))?;
        ReturnSeries::new(asset.to_string(), self.dates.clone(), column.to_owned())
    }

    /// Keep only the given assets, in the given order.
    pub fn select(&self, assets: &[&str]) -> Result<Self> {
        let mut indices = Vec::with_capacity(assets.len());
        for asset in assets {
            let idx = self
                .asset_index(asset)
                .ok_or_else(|| DataError::UnknownAsset((*asset).to_string()))?;
            indices.push(idx);
        }

        let values = self.values.select(Axis(1), &indices);
        Self::new(
            self.dates.clone(),
            assets.iter().map(|a| (*a).to_string()).collect(),
            values,
        )
    }

    /// Keep only rows whose date lies within `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let rows: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= start && **d <= end)
            .map(|(i, _)| i)
            .collect();

        Self::new(
            rows.iter().map(|&i| self.dates[i]).collect(),
            self.assets.clone(),
            self.values.select(Axis(0), &rows),
        )
    }

    /// Build a table from a polars frame with a date column and numeric asset columns.
    ///
    /// Every column other than `date_column` is treated as an asset. Rows with
    /// a null in any asset column are dropped.
    pub fn from_dataframe(df: &DataFrame, date_column: &str) -> Result<Self> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();

        if !names.iter().any(|n| n == date_column) {
            return Err(DataError::MissingColumn {
                column: date_column.to_string(),
                source_name: "return frame".to_string(),
            });
        }

        let assets: Vec<String> = names.into_iter().filter(|n| n != date_column).collect();
        let raw_dates = crate::loader::column_as_strings(df, date_column)?;

        let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(assets.len());
        for asset in &assets {
            columns.push(crate::loader::column_as_f64(df, asset)?);
        }

        let mut dates = Vec::with_capacity(df.height());
        let mut flat = Vec::with_capacity(df.height() * assets.len());
        let mut dropped = 0usize;

        for (row, raw) in raw_dates.iter().enumerate() {
            let Some(raw) = raw else {
                dropped += 1;
                continue;
            };
            let row_values: Option<Vec<f64>> = columns.iter().map(|c| c[row]).collect();
            match row_values {
                Some(values) => {
                    dates.push(crate::loader::parse_date(raw)?);
                    flat.extend(values);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::warn!(dropped, "dropped rows with missing values from return table");
        }

        if dates.is_empty() {
            return Err(DataError::Empty("return table has no complete rows".to_string()));
        }

        let values = Array2::from_shape_vec((dates.len(), assets.len()), flat)
            .map_err(|e| DataError::Parse(e.to_string()))?;
        Self::new(dates, assets, values)
    }

    /// Convert to a polars frame with a `date` column followed by one column per asset.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.n_assets() + 1);
        columns.push(Column::new("date".into(), self.dates.clone()));
        for (idx, asset) in self.assets.iter().enumerate() {
            let values: Vec<f64> = self.values.index_axis(Axis(1), idx).to_vec();
            columns.push(Column::new(asset.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// A single dated return series.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Array1<f64>,
}

impl ReturnSeries {
    /// Create a validated series.
    pub fn new(name: String, dates: Vec<NaiveDate>, values: Array1<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(DataError::DimensionMismatch {
                expected: dates.len(),
                actual: values.len(),
            });
        }
        check_increasing(&dates)?;
        Ok(Self {
            name,
            dates,
            values,
        })
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Period dates, oldest first.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Periodic returns.
    pub const fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no periods.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rename the series.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// View the series as a one-column return table.
    pub fn to_table(&self) -> Result<ReturnTable> {
        let values = self.values.clone().insert_axis(Axis(1));
        ReturnTable::new(self.dates.clone(), vec![self.name.clone()], values)
    }
}

fn check_increasing(dates: &[NaiveDate]) -> Result<()> {
    for pair in dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(DataError::UnorderedDates {
                previous: pair[0].to_string(),
                next: pair[1].to_string(),
            });
        }
    }
    Ok(())
}
