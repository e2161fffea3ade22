//! Trading signals.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tangent_trading::Side;

/// Desired exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Net long
    #[display("long")]
    Long,
    /// Net short
    #[display("short")]
    Short,
    /// No position
    #[default]
    #[display("flat")]
    Flat,
}

impl Direction {
    /// +1, -1 or 0.
    pub const fn as_i64(&self) -> i64 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::Flat => 0,
        }
    }

    /// Order side that moves toward this direction; `None` when flat.
    pub const fn side(&self) -> Option<Side> {
        match self {
            Self::Long => Some(Side::Buy),
            Self::Short => Some(Side::Sell),
            Self::Flat => None,
        }
    }
}

/// A signal change that the backtest acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Bar time
    pub timestamp: DateTime<Utc>,
    /// New signal
    pub direction: Direction,
    /// Price of the primary instrument at the bar
    pub price: f64,
    /// Indicator values at the bar (e.g. moving averages, z-score)
    pub indicators: BTreeMap<String, f64>,
}

impl SignalEvent {
    /// Event with no indicator values.
    pub const fn new(timestamp: DateTime<Utc>, direction: Direction, price: f64) -> Self {
        Self {
            timestamp,
            direction,
            price,
            indicators: BTreeMap::new(),
        }
    }

    /// Attach an indicator value.
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.indicators.insert(name.to_string(), value);
        self
    }
}
