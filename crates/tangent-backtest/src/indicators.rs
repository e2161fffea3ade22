//! Rolling indicators over price vectors.
//!
//! Windows are computed with polars lazy rolling expressions. A value is
//! `None` until the window holds `min_periods` observations. Rolling standard
//! deviations use the sample (n-1) denominator.

use crate::error::{BacktestError, Result};
use polars::prelude::*;

const VALUE: &str = "value";

fn frame(values: &[f64]) -> Result<LazyFrame> {
    Ok(DataFrame::new(vec![Column::new(VALUE.into(), values)])?.lazy())
}

fn options(window: usize, min_periods: usize) -> Result<RollingOptionsFixedWindow> {
    if window == 0 || min_periods == 0 || min_periods > window {
        return Err(BacktestError::InvalidParameter(format!(
            "rolling window {window} with min_periods {min_periods}"
        )));
    }
    Ok(RollingOptionsFixedWindow {
        window_size: window,
        min_periods,
        ..Default::default()
    })
}

fn extract(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Rolling mean and rolling sample standard deviation.
pub fn rolling_mean_std(
    values: &[f64],
    window: usize,
    min_periods: usize,
) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>)> {
    let opts = options(window, min_periods)?;
    let df = frame(values)?
        .select([
            col(VALUE).rolling_mean(opts.clone()).alias("mean"),
            col(VALUE).rolling_std(opts).alias("std"),
        ])
        .collect()?;
    Ok((extract(&df, "mean")?, extract(&df, "std")?))
}

/// Simple moving average over a full window.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let df = frame(values)?
        .select([col(VALUE)
            .rolling_mean(options(window, window)?)
            .alias("mean")])
        .collect()?;
    extract(&df, "mean")
}

/// Bollinger bands: `mid ± num_std * std` over a full window.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    /// Upper band
    pub upper: Vec<Option<f64>>,
    /// Moving average
    pub mid: Vec<Option<f64>>,
    /// Lower band
    pub lower: Vec<Option<f64>>,
}

impl BollingerBands {
    /// Compute the bands.
    pub fn compute(values: &[f64], window: usize, num_std: f64) -> Result<Self> {
        if !num_std.is_finite() || num_std <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "band width must be positive, got {num_std}"
            )));
        }
        let (mid, std) = rolling_mean_std(values, window, window)?;
        let band = |sign: f64| -> Vec<Option<f64>> {
            mid.iter()
                .zip(&std)
                .map(|(m, s)| Some(m.as_ref()? + sign * num_std * s.as_ref()?))
                .collect()
        };
        Ok(Self {
            upper: band(1.0),
            lower: band(-1.0),
            mid,
        })
    }

    /// All three bands at `i`, if defined.
    pub fn at(&self, i: usize) -> Option<(f64, f64, f64)> {
        Some((
            (*self.upper.get(i)?)?,
            (*self.mid.get(i)?)?,
            (*self.lower.get(i)?)?,
        ))
    }
}

/// Rolling z-score `(x - mean) / std`; `None` where the window is short or
/// the deviation is zero.
pub fn rolling_zscore(values: &[f64], window: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let (mean, std) = rolling_mean_std(values, window, min_periods)?;
    Ok(values
        .iter()
        .zip(mean.iter().zip(&std))
        .map(|(x, (m, s))| match (m, s) {
            (Some(m), Some(s)) if *s > 0.0 => Some((x - m) / s),
            _ => None,
        })
        .collect())
}

/// OLS slope of `y` on `x` (with intercept).
///
/// Returns `None` when `x` has no variance or the lengths differ.
pub fn ols_slope(y: &[f64], x: &[f64]) -> Option<f64> {
    if y.len() != x.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (sxy, sxx) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(sxy, sxx), (xi, yi)| {
            let dx = xi - mean_x;
            (sxy + dx * (yi - mean_y), sxx + dx * dx)
        });
    (sxx > 0.0).then(|| sxy / sxx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_moving_average_needs_full_window() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert_eq!(ma[0], None);
        assert_eq!(ma[1], None);
        assert_relative_eq!(ma[2].unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(ma[3].unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_std_is_sample() {
        let (_, std) = rolling_mean_std(&[1.0, 2.0, 3.0], 3, 3).unwrap();
        assert_relative_eq!(std[2].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bollinger_bands() {
        let bands = BollingerBands::compute(&[1.0, 2.0, 3.0, 10.0], 3, 2.0).unwrap();
        assert!(bands.at(1).is_none());
        let (upper, mid, lower) = bands.at(2).unwrap();
        assert_relative_eq!(mid, 2.0, epsilon = 1e-12);
        assert_relative_eq!(upper, 4.0, epsilon = 1e-12);
        assert_relative_eq!(lower, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zscore_min_periods() {
        let values: Vec<f64> = (0..12).map(|i| (i as f64).sin()).collect();
        let z = rolling_zscore(&values, 20, 10).unwrap();
        assert!(z[..9].iter().all(Option::is_none));
        assert!(z[9].is_some());
    }

    #[test]
    fn test_ols_slope() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.5 * v).collect();
        assert_relative_eq!(ols_slope(&y, &x).unwrap(), 2.5, epsilon = 1e-12);
        assert!(ols_slope(&y, &[1.0, 1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_invalid_window() {
        assert!(moving_average(&[1.0], 0).is_err());
        assert!(rolling_mean_std(&[1.0], 3, 4).is_err());
    }
}
