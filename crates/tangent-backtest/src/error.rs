//! Error types for backtests.

use tangent_data::DataError;
use tangent_trading::OmsError;
use thiserror::Error;

/// Result type for backtest operations.
pub type Result<T> = std::result::Result<T, BacktestError>;

/// Errors that can occur while running a backtest.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Not enough price history for the configured windows
    #[error("Insufficient data: need at least {required} prices, got {actual}")]
    InsufficientData {
        /// Required number of prices
        required: usize,
        /// Available number of prices
        actual: usize,
    },

    /// Invalid strategy or risk parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Wrong number of price series for the strategy
    #[error("{strategy} needs {expected} price series, got {actual}")]
    SeriesCount {
        /// Strategy name
        strategy: &'static str,
        /// Required number of series
        expected: usize,
        /// Supplied number of series
        actual: usize,
    },

    /// Order rejected by the OMS
    #[error("Order error: {0}")]
    Oms(#[from] OmsError),

    /// Price data error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Polars error from indicator computation
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
