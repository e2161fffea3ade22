//! Price history and a file-backed price store.
//!
//! Price files are CSV with a timestamp column (`date`, `timestamp` or
//! `datetime`) and a closing price column (`close`, `last_price` or
//! `adj_close`). `open`, `high`, `low` and `volume` are optional. Column
//! names are matched case-insensitively and all timestamps are held in UTC.

use crate::error::{DataError, Result};
use crate::loader::{column_as_f64, column_as_strings, parse_timestamp, read_csv};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const TIMESTAMP_COLUMNS: &[&str] = &["date", "timestamp", "datetime"];
const CLOSE_COLUMNS: &[&str] = &["close", "last_price", "adj_close", "adj close"];

/// One OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Opening price.
    pub open: Option<f64>,
    /// High price.
    pub high: Option<f64>,
    /// Low price.
    pub low: Option<f64>,
    /// Closing (last) price.
    pub close: f64,
    /// Traded volume.
    pub volume: Option<u64>,
}

impl PriceBar {
    /// A bar with only a closing price.
    pub const fn close_only(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Chronologically ordered price bars for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Create a history, sorting bars by timestamp.
    ///
    /// # Errors
    /// Fails on duplicate timestamps.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Result<Self> {
        bars.sort_by_key(|b| b.timestamp);
        for pair in bars.windows(2) {
            if pair[0].timestamp == pair[1].timestamp {
                return Err(DataError::UnorderedDates {
                    previous: pair[0].timestamp.to_rfc3339(),
                    next: pair[1].timestamp.to_rfc3339(),
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    /// Build a close-only history from `(timestamp, close)` pairs.
    pub fn from_closes(
        symbol: impl Into<String>,
        closes: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Result<Self> {
        let bars = closes
            .into_iter()
            .map(|(ts, close)| PriceBar::close_only(ts, close))
            .collect();
        Self::new(symbol, bars)
    }

    /// Load a history from a CSV file.
    pub fn from_csv(symbol: impl Into<String>, path: &Path) -> Result<Self> {
        let symbol = symbol.into();
        let df = read_csv(path)?;
        let history = Self::from_dataframe(symbol, &df, path)?;
        tracing::debug!(symbol = %history.symbol, bars = history.len(), "loaded price history");
        Ok(history)
    }

    fn from_dataframe(symbol: String, df: &DataFrame, path: &Path) -> Result<Self> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        let find = |candidates: &[&str]| {
            names
                .iter()
                .find(|n| candidates.iter().any(|c| n.eq_ignore_ascii_case(c)))
                .cloned()
        };
        let missing = |column: &str| DataError::MissingColumn {
            column: column.to_string(),
            source_name: path.display().to_string(),
        };

        let ts_col = find(TIMESTAMP_COLUMNS).ok_or_else(|| missing("date"))?;
        let close_col = find(CLOSE_COLUMNS).ok_or_else(|| missing("close"))?;

        let timestamps = column_as_strings(df, &ts_col)?;
        let closes = column_as_f64(df, &close_col)?;
        let optional = |name: &str| -> Result<Vec<Option<f64>>> {
            match find(&[name]) {
                Some(col) => column_as_f64(df, &col),
                None => Ok(vec![None; df.height()]),
            }
        };
        let opens = optional("open")?;
        let highs = optional("high")?;
        let lows = optional("low")?;
        let volumes = optional("volume")?;

        let mut bars = Vec::with_capacity(df.height());
        let mut dropped = 0usize;
        for row in 0..df.height() {
            let (Some(raw_ts), Some(close)) = (&timestamps[row], closes[row]) else {
                dropped += 1;
                continue;
            };
            bars.push(PriceBar {
                timestamp: parse_timestamp(raw_ts)?,
                open: opens[row],
                high: highs[row],
                low: lows[row],
                close,
                volume: volumes[row].filter(|v| *v >= 0.0).map(|v| v as u64),
            });
        }

        if dropped > 0 {
            tracing::warn!(%symbol, dropped, "dropped price rows without timestamp or close");
        }

        Self::new(symbol, bars)
    }

    /// Symbol of this history.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// All bars, oldest first.
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether the history has no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar timestamps.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Closing prices.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Most recent bar, if any.
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Closing price as of `timestamp`: the last bar at or before it.
    pub fn price_at(&self, timestamp: DateTime<Utc>) -> Result<f64> {
        let idx = self.bars.partition_point(|b| b.timestamp <= timestamp);
        if idx == 0 {
            return Err(DataError::TimestampOutOfRange {
                symbol: self.symbol.clone(),
                timestamp: timestamp.to_rfc3339(),
            });
        }
        Ok(self.bars[idx - 1].close)
    }

    /// Bars with timestamps in `[start, end]`.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        let bars = self
            .bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .cloned()
            .collect();
        Ok(Self {
            symbol: self.symbol.clone(),
            bars,
        })
    }

    /// Total volume over `[start, end]`.
    ///
    /// # Errors
    /// Fails when any bar in the range has no volume.
    pub fn total_volume(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64> {
        self.between(start, end)?
            .bars
            .iter()
            .map(|b| {
                b.volume.ok_or_else(|| DataError::MissingData {
                    symbol: self.symbol.clone(),
                    reason: format!("no volume at {}", b.timestamp.to_rfc3339()),
                })
            })
            .sum()
    }
}

/// Loads price histories from `<dir>/<SYMBOL>.csv` and caches them per symbol.
#[derive(Debug)]
pub struct PriceStore {
    dir: PathBuf,
    cache: HashMap<String, PriceHistory>,
}

impl PriceStore {
    /// Create a store over a data directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `symbol`.
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Insert a history directly, replacing any cached entry.
    pub fn insert(&mut self, history: PriceHistory) {
        self.cache.insert(history.symbol().to_string(), history);
    }

    /// Whether `symbol` is already cached.
    pub fn is_cached(&self, symbol: &str) -> bool {
        self.cache.contains_key(symbol)
    }

    /// Full history for `symbol`, loading it on first use.
    pub fn history(&mut self, symbol: &str) -> Result<&PriceHistory> {
        if !self.cache.contains_key(symbol) {
            let path = self.path_for(symbol);
            if !path.exists() {
                return Err(DataError::MissingData {
                    symbol: symbol.to_string(),
                    reason: format!("no price file at {}", path.display()),
                });
            }
            let history = PriceHistory::from_csv(symbol, &path)?;
            self.cache.insert(symbol.to_string(), history);
        } else {
            tracing::debug!(%symbol, "using cached price history");
        }

        self.cache.get(symbol).ok_or_else(|| DataError::MissingData {
            symbol: symbol.to_string(),
            reason: "cache miss after load".to_string(),
        })
    }

    /// History restricted to `[start, end]`.
    pub fn history_between(
        &mut self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceHistory> {
        self.history(symbol)?.between(start, end)
    }

    /// As-of closing price.
    pub fn price_at(&mut self, symbol: &str, timestamp: DateTime<Utc>) -> Result<f64> {
        self.history(symbol)?.price_at(timestamp)
    }

    /// Total traded volume over `[start, end]`.
    pub fn volume(&mut self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64> {
        self.history(symbol)?.total_volume(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap()
    }

    fn history() -> PriceHistory {
        let bars = vec![
            PriceBar {
                volume: Some(100),
                ..PriceBar::close_only(ts(3), 11.0)
            },
            PriceBar {
                volume: Some(50),
                ..PriceBar::close_only(ts(2), 10.0)
            },
            PriceBar {
                volume: Some(25),
                ..PriceBar::close_only(ts(5), 12.0)
            },
        ];
        PriceHistory::new("AAPL", bars).unwrap()
    }

    #[test]
    fn test_bars_sorted_on_construction() {
        let h = history();
        assert_eq!(h.closes(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_price_at_forward_fills() {
        let h = history();
        assert_eq!(h.price_at(ts(3)).unwrap(), 11.0);
        assert_eq!(h.price_at(ts(4)).unwrap(), 11.0);
        assert_eq!(h.price_at(ts(30)).unwrap(), 12.0);
    }

    #[test]
    fn test_price_before_first_bar_fails() {
        let h = history();
        assert!(matches!(
            h.price_at(ts(1)),
            Err(DataError::TimestampOutOfRange { .. })
        ));
    }

    #[test]
    fn test_total_volume_range() {
        let h = history();
        assert_eq!(h.total_volume(ts(2), ts(3)).unwrap(), 150);
        assert_eq!(h.total_volume(ts(1), ts(30)).unwrap(), 175);
        assert!(h.total_volume(ts(5), ts(2)).is_err());
    }

    #[test]
    fn test_duplicate_timestamps_rejected() {
        let bars = vec![
            PriceBar::close_only(ts(2), 10.0),
            PriceBar::close_only(ts(2), 10.5),
        ];
        assert!(PriceHistory::new("AAPL", bars).is_err());
    }

    #[test]
    fn test_store_uses_inserted_history() {
        let mut store = PriceStore::new("/nonexistent");
        store.insert(history());
        assert!(store.is_cached("AAPL"));
        assert_eq!(store.price_at("AAPL", ts(4)).unwrap(), 11.0);
        assert!(matches!(
            store.history("MSFT"),
            Err(DataError::MissingData { .. })
        ));
    }
}
