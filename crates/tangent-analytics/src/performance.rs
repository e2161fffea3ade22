//! Realized performance of weighted portfolios.

use crate::{
    annualization::Annualization,
    error::{AnalyticsError, Result},
    metrics::{MetricsTable, series_metrics},
    tangency::WeightVector,
};
use tangent_data::{ReturnSeries, ReturnTable};
use tracing::debug;

/// Default name given to a portfolio return series.
pub const PORTFOLIO_NAME: &str = "portfolio";

/// Historical portfolio returns `R w`.
///
/// The weights must name exactly the table's assets; their order does not
/// matter. Weights are applied as given, with no rescaling.
pub fn portfolio_returns(table: &ReturnTable, weights: &WeightVector) -> Result<ReturnSeries> {
    let aligned = weights.aligned_to(table.assets())?;
    let values = table.values().dot(&aligned);
    debug!(
        n_periods = values.len(),
        weight_sum = aligned.sum(),
        "computed portfolio returns"
    );
    Ok(ReturnSeries::new(
        PORTFOLIO_NAME.to_string(),
        table.dates().to_vec(),
        values,
    )?)
}

/// Annualized metrics for each series, one row per series name.
pub fn performance_metrics(series: &[ReturnSeries], adj: Annualization) -> Result<MetricsTable> {
    if series.is_empty() {
        return Err(AnalyticsError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let mut table = MetricsTable::new();
    for s in series {
        if table.get(s.name()).is_some() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "duplicate series name '{}'",
                s.name()
            )));
        }
        table.insert(s.name(), series_metrics(s, adj)?);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::array;

    fn dates(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
            .collect()
    }

    fn sample_table() -> ReturnTable {
        ReturnTable::new(
            dates(3),
            vec!["A".into(), "B".into()],
            array![[0.01, 0.00], [0.02, 0.01], [-0.01, 0.01]],
        )
        .unwrap()
    }

    #[test]
    fn test_portfolio_returns_weighted_sum() {
        let weights = WeightVector::new(vec!["B".into(), "A".into()], vec![2.0, 1.0]).unwrap();
        let series = portfolio_returns(&sample_table(), &weights).unwrap();
        assert_eq!(series.name(), PORTFOLIO_NAME);
        assert_relative_eq!(series.values()[0], 0.01, epsilon = 1e-15);
        assert_relative_eq!(series.values()[1], 0.04, epsilon = 1e-15);
        assert_relative_eq!(series.values()[2], 0.01, epsilon = 1e-15);
    }

    #[test]
    fn test_portfolio_returns_requires_matching_assets() {
        let weights = WeightVector::new(vec!["A".into(), "C".into()], vec![0.5, 0.5]).unwrap();
        assert!(matches!(
            portfolio_returns(&sample_table(), &weights),
            Err(AnalyticsError::AssetMismatch(_))
        ));
    }

    #[test]
    fn test_performance_metrics_row_per_series() {
        let a = ReturnSeries::new("P1".into(), dates(3), array![0.01, 0.02, -0.01]).unwrap();
        let b = ReturnSeries::new("P2".into(), dates(3), array![0.00, 0.01, 0.01]).unwrap();
        let table = performance_metrics(&[a, b], Annualization::Monthly).unwrap();
        assert_eq!(table.names(), vec!["P1", "P2"]);
        assert_relative_eq!(table.get("P1").unwrap().mean, 0.08, epsilon = 1e-12);
    }

    #[test]
    fn test_performance_metrics_rejects_duplicates_and_empty() {
        let a = ReturnSeries::new("P".into(), dates(2), array![0.01, 0.02]).unwrap();
        assert!(performance_metrics(&[a.clone(), a], Annualization::Monthly).is_err());
        assert!(performance_metrics(&[], Annualization::Monthly).is_err());
    }
}
