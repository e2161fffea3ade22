//! Sampling frequency and annualization factors.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Number of periods per year used to scale periodic statistics.
///
/// The factor must match the sampling frequency of the data it is applied
/// to. Nothing here checks that; a weekly table summarized as monthly gives
/// silently wrong numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum Annualization {
    /// 252 trading days per year.
    #[display("daily (252)")]
    Daily,
    /// 52 weeks per year.
    #[display("weekly (52)")]
    Weekly,
    /// 12 months per year.
    #[default]
    #[display("monthly (12)")]
    Monthly,
    /// Caller-supplied periods per year.
    #[display("custom ({_0})")]
    Custom(f64),
}

impl Annualization {
    /// Periods per year.
    pub const fn periods_per_year(&self) -> f64 {
        match self {
            Self::Daily => 252.0,
            Self::Weekly => 52.0,
            Self::Monthly => 12.0,
            Self::Custom(n) => *n,
        }
    }

    /// Multiplier applied to a periodic mean.
    pub const fn mean_scale(&self) -> f64 {
        self.periods_per_year()
    }

    /// Multiplier applied to a periodic standard deviation.
    pub fn volatility_scale(&self) -> f64 {
        self.periods_per_year().sqrt()
    }

    /// Map a raw factor to a named frequency when it matches one.
    pub fn from_periods(periods: f64) -> Self {
        match periods {
            p if p == 252.0 => Self::Daily,
            p if p == 52.0 => Self::Weekly,
            p if p == 12.0 => Self::Monthly,
            p => Self::Custom(p),
        }
    }

    /// Whether the factor is usable (finite and positive).
    pub fn is_valid(&self) -> bool {
        let n = self.periods_per_year();
        n.is_finite() && n > 0.0
    }
}
