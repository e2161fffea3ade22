//! CLI error type.

use tangent::{
    analytics::AnalyticsError,
    backtest::BacktestError,
    data::DataError,
    output::{ExportError, ReportError},
    trading::{OmsError, OrderError},
};
use thiserror::Error;

/// Anything that can stop a command.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Input files could not be read
    #[error(transparent)]
    Data(#[from] DataError),

    /// Metric or portfolio computation failed
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Strategy run failed
    #[error(transparent)]
    Backtest(#[from] BacktestError),

    /// Order replay was rejected
    #[error(transparent)]
    Oms(#[from] OmsError),

    /// Order file row could not be parsed
    #[error("Order file: {0}")]
    Order(#[from] OrderError),

    /// Export failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Report failed
    #[error(transparent)]
    Report(#[from] ReportError),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Order file could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Logging could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Bad command-line input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
