//! CSV and JSON export of metrics, weights, fills and backtest results.

use polars::prelude::{CsvWriter, DataFrame, PolarsError, SerWriter};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path, str::FromStr};
use tangent_analytics::{MetricsTable, WeightVector};
use tangent_backtest::BacktestResult;
use tangent_trading::{BlotterEntry, ExecutionReport, PnlSummary};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced invalid UTF-8.
    #[error("Encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Polars error while writing a frame.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Infer the format from a file extension (`.json` exports pretty JSON).
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::PrettyJson),
            _ => Err(ExportError::InvalidFormat(format!(
                "cannot infer export format from {}",
                path.display()
            ))),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        debug!(path = %path.display(), ?format, bytes = content.len(), "exported");
        Ok(())
    }
}

fn to_csv<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn to_json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(serde_json::to_string(value)?),
    }
}

/// One metrics table row as a flat CSV record.
#[derive(Debug, Serialize)]
struct MetricsRecordFlat<'a> {
    name: &'a str,
    mean: f64,
    vol: f64,
    sharpe: f64,
}

impl Exporter for MetricsTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self.iter().map(|(name, m)| MetricsRecordFlat {
                name,
                mean: m.mean,
                vol: m.vol,
                sharpe: m.sharpe,
            })),
            _ => to_json(self.rows(), format),
        }
    }
}

#[derive(Debug, Serialize)]
struct WeightRecord<'a> {
    asset: &'a str,
    weight: f64,
}

impl Exporter for WeightVector {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(
                self.iter()
                    .map(|(asset, weight)| WeightRecord { asset, weight }),
            ),
            _ => to_json(self, format),
        }
    }
}

impl Exporter for Vec<ExecutionReport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self),
            _ => to_json(self, format),
        }
    }
}

impl Exporter for Vec<BlotterEntry> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self),
            _ => to_json(self, format),
        }
    }
}

/// P&L field or position as a `metric,value` CSV row.
#[derive(Debug, Serialize)]
struct PnlRecord {
    metric: String,
    value: f64,
}

impl Exporter for PnlSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut records = vec![
                    PnlRecord {
                        metric: "realized_pnl".to_string(),
                        value: self.realized_pnl,
                    },
                    PnlRecord {
                        metric: "unrealized_pnl".to_string(),
                        value: self.unrealized_pnl,
                    },
                    PnlRecord {
                        metric: "total_pnl".to_string(),
                        value: self.total_pnl,
                    },
                    PnlRecord {
                        metric: "current_cash".to_string(),
                        value: self.current_cash,
                    },
                ];
                records.extend(self.positions.iter().map(|(symbol, qty)| PnlRecord {
                    metric: format!("position_{symbol}"),
                    value: *qty as f64,
                }));
                to_csv(records)
            }
            _ => to_json(self, format),
        }
    }
}

/// CSV carries the fills; JSON carries the whole result.
impl Exporter for BacktestResult {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(&self.trades),
            _ => to_json(self, format),
        }
    }
}

/// Write a polars frame to a CSV file with a header row.
pub fn export_frame(frame: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(frame)?;
    debug!(path = %path.display(), rows = frame.height(), "exported frame");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tangent_analytics::MetricsRecord;

    fn table() -> MetricsTable {
        let mut table = MetricsTable::new();
        table.insert(
            "AAPL",
            MetricsRecord {
                mean: 0.12,
                vol: 0.2,
                sharpe: 0.6,
            },
        );
        table.insert(
            "CASH",
            MetricsRecord {
                mean: 0.0,
                vol: 0.0,
                sharpe: f64::NAN,
            },
        );
        table
    }

    #[test]
    fn test_metrics_csv_has_flat_header() {
        let csv = table().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("name,mean,vol,sharpe"));
        assert_eq!(lines.next(), Some("AAPL,0.12,0.2,0.6"));
        assert_eq!(lines.next(), Some("CASH,0.0,0.0,NaN"));
    }

    #[test]
    fn test_metrics_json_rows() {
        let json = table().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.starts_with("[{\"name\":\"AAPL\",\"mean\":0.12"));
        // serde_json writes non-finite floats as null
        assert!(json.contains("\"sharpe\":null"));
    }

    #[test]
    fn test_weights_csv() {
        let weights =
            WeightVector::new(vec!["A".to_string(), "B".to_string()], vec![1.5, -0.5]).unwrap();
        let csv = weights.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv, "asset,weight\nA,1.5\nB,-0.5\n");
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/weights.csv")).unwrap(),
            ExportFormat::Csv
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("report.json")).unwrap(),
            ExportFormat::PrettyJson
        );
        assert!(ExportFormat::from_path(Path::new("weights.xlsx")).is_err());
    }

    #[test]
    fn test_pnl_csv_lists_positions() {
        let summary = PnlSummary {
            realized_pnl: 10.0,
            unrealized_pnl: -2.0,
            total_pnl: 8.0,
            current_cash: 1_008.0,
            positions: [("AAPL".to_string(), 5_i64)].into_iter().collect(),
        };
        let csv = summary.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("metric,value\nrealized_pnl,10.0\n"));
        assert!(csv.ends_with("position_AAPL,5.0\n"));
    }
}
