//! CSV loading for returns workbooks.
//!
//! A workbook is the pair of sheets the analysis starts from: a table of
//! excess returns (one column per ticker) and a benchmark return series. Each
//! sheet is stored as its own CSV file whose first column holds the dates.

use crate::error::{DataError, Result};
use crate::returns::{ReturnSeries, ReturnTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ndarray::Array1;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Name of the date column expected in every sheet.
pub const DATE_COLUMN: &str = "date";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Read a CSV file with a header row into a polars frame.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    tracing::debug!(path = %path.display(), "reading csv");
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Load a return table from CSV.
///
/// The first column named `date` (case-insensitive) holds the period dates;
/// every other column is an asset.
pub fn load_return_table(path: &Path) -> Result<ReturnTable> {
    let df = normalize_date_column(read_csv(path)?, path)?;
    let table = ReturnTable::from_dataframe(&df, DATE_COLUMN)?;
    tracing::info!(
        path = %path.display(),
        periods = table.n_periods(),
        assets = table.n_assets(),
        "loaded return table"
    );
    Ok(table)
}

/// Load a single-column benchmark return series from CSV.
///
/// When `column` is `None` the first non-date column is used.
pub fn load_benchmark(path: &Path, column: Option<&str>) -> Result<ReturnSeries> {
    let df = normalize_date_column(read_csv(path)?, path)?;

    let name = match column {
        Some(c) => c.to_string(),
        None => df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .find(|n| n != DATE_COLUMN)
            .ok_or_else(|| DataError::Empty(format!("{} has no value column", path.display())))?,
    };

    let frame = df.select([DATE_COLUMN, name.as_str()])?;
    let table = ReturnTable::from_dataframe(&frame, DATE_COLUMN)?;
    let series = table.series(&name)?;
    tracing::info!(path = %path.display(), benchmark = %name, periods = series.len(), "loaded benchmark");
    Ok(series)
}

/// The two sheets of a returns workbook.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Excess returns, one column per asset.
    pub returns: ReturnTable,
    /// Benchmark return series, if a benchmark sheet was supplied.
    pub benchmark: Option<ReturnSeries>,
}

impl Workbook {
    /// Load the returns sheet and, optionally, the benchmark sheet.
    pub fn load(returns_path: &Path, benchmark_path: Option<&Path>) -> Result<Self> {
        let returns = load_return_table(returns_path)?;
        let benchmark = benchmark_path
            .map(|p| load_benchmark(p, None))
            .transpose()?;
        Ok(Self { returns, benchmark })
    }

    /// Load `returns.csv` and, when present, `benchmark.csv` from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let returns_path = dir.join("returns.csv");
        let benchmark_path: PathBuf = dir.join("benchmark.csv");
        let benchmark = benchmark_path.exists().then_some(benchmark_path);
        Self::load(&returns_path, benchmark.as_deref())
    }
}

/// Rename the first case-insensitive `date` column to exactly [`DATE_COLUMN`].
fn normalize_date_column(mut df: DataFrame, path: &Path) -> Result<DataFrame> {
    let found = df
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .find(|n| n.eq_ignore_ascii_case(DATE_COLUMN));

    match found {
        Some(name) if name == DATE_COLUMN => Ok(df),
        Some(name) => {
            df.rename(&name, DATE_COLUMN.into())?;
            Ok(df)
        }
        None => Err(DataError::MissingColumn {
            column: DATE_COLUMN.to_string(),
            source_name: path.display().to_string(),
        }),
    }
}

/// Read a column as optional strings, casting non-string dtypes.
pub(crate) fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Read a column as optional `f64`, casting integer dtypes.
pub(crate) fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Parse a calendar date, accepting a trailing time component.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }
    parse_timestamp(raw).map(|ts| ts.date_naive())
}

/// Parse a timestamp as UTC. Bare dates map to midnight.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc());
            }
        }
    }
    Err(DataError::InvalidDate(raw.to_string()))
}

/// Build a benchmark-like series directly from labelled values.
pub fn series_from_pairs(name: &str, pairs: &[(NaiveDate, f64)]) -> Result<ReturnSeries> {
    let dates = pairs.iter().map(|(d, _)| *d).collect();
    let values = Array1::from_iter(pairs.iter().map(|(_, v)| *v));
    ReturnSeries::new(name.to_string(), dates, values)
}
