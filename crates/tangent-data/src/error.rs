//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// A date or timestamp that matches none of the accepted formats
    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    /// Dates are not strictly increasing
    #[error("Dates must be strictly increasing: {previous} is followed by {next}")]
    UnorderedDates {
        /// Earlier row's date
        previous: String,
        /// Offending row's date
        next: String,
    },

    /// The same asset identifier appears twice
    #[error("Duplicate asset identifier: {0}")]
    DuplicateAsset(String),

    /// Asset identifier not present in the table
    #[error("Unknown asset identifier: {0}")]
    UnknownAsset(String),

    /// A required column is missing from the input
    #[error("Missing column '{column}' in {source_name}")]
    MissingColumn {
        /// Column that was looked up
        column: String,
        /// File or frame the column was expected in
        source_name: String,
    },

    /// Shape mismatch between labels and values
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Table or series has no usable data
    #[error("Empty data: {0}")]
    Empty(String),

    /// Missing data
    #[error("Missing data for {symbol}: {reason}")]
    MissingData {
        /// Symbol that was queried
        symbol: String,
        /// Reason for missing data
        reason: String,
    },

    /// Lookup before the first available observation
    #[error("No observation for {symbol} at or before {timestamp}")]
    TimestampOutOfRange {
        /// Symbol that was queried
        symbol: String,
        /// Requested timestamp
        timestamp: String,
    },

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
