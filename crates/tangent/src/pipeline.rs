//! End-to-end tangency analysis over a loaded workbook.

use serde::{Deserialize, Serialize};
use tangent_analytics::{
    Annualization, CovarianceMethod, MetricsTable, Normalization, PORTFOLIO_NAME, Result,
    ReturnBasis, TangencyPortfolio, WeightVector, performance_metrics, portfolio_returns,
    return_metrics,
};
use tangent_data::{ReturnSeries, Workbook};
use tangent_output::{MetricsSummary, Report, ReportBuilder, ReportError, WeightsSummary};
use tracing::info;

/// Settings for [`run_tangency_pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Periods per year of the return data (default: monthly)
    pub annualization: Annualization,
    /// Whether the returns are already excess returns (default: excess)
    pub return_basis: ReturnBasis,
    /// Weight scaling applied before computing realized returns (default: none)
    pub normalization: Normalization,
    /// Covariance estimator (default: sample)
    pub covariance: CovarianceMethod,
}

/// Everything the pipeline computes.
#[derive(Debug, Clone)]
pub struct TangencyAnalysis {
    /// Settings the analysis ran with
    pub config: PipelineConfig,
    /// Annualized metrics per asset
    pub asset_metrics: MetricsTable,
    /// Tangency portfolio with its inputs
    pub portfolio: TangencyPortfolio,
    /// Weights used for realized returns (normalized per the config)
    pub weights: WeightVector,
    /// Realized per-period portfolio returns `R w`
    pub portfolio_returns: ReturnSeries,
    /// Annualized metrics of the portfolio and the benchmark, if any
    pub performance: MetricsTable,
}

impl TangencyAnalysis {
    /// Asset metrics as a renderable summary.
    pub fn asset_summary(&self) -> MetricsSummary {
        MetricsSummary::new("Asset metrics", self.config.annualization, &self.asset_metrics)
    }

    /// Tangency weights as a renderable summary.
    pub fn weights_summary(&self) -> WeightsSummary {
        WeightsSummary::new("Tangency portfolio", &self.portfolio)
    }

    /// Portfolio and benchmark metrics as a renderable summary.
    pub fn performance_summary(&self) -> MetricsSummary {
        MetricsSummary::new("Performance", self.config.annualization, &self.performance)
    }

    /// JSON report with one section per summary plus the applied weights.
    pub fn to_report(&self) -> std::result::Result<Report, ReportError> {
        Ok(ReportBuilder::new()
            .title("Tangency analysis")
            .section("config", &self.config)?
            .section("asset_metrics", &self.asset_summary())?
            .section("tangency", &self.weights_summary())?
            .section("weights", &self.weights)?
            .section("performance", &self.performance_summary())?
            .build())
    }
}

/// Run the full tangency analysis.
///
/// 1. annualized mean, volatility and Sharpe for every asset
/// 2. tangency weights `Σ⁻¹μ` with the configured covariance estimator
/// 3. realized portfolio returns with the (optionally normalized) weights
/// 4. performance metrics for the portfolio and the workbook's benchmark
///
/// # Errors
/// Fails on invalid annualization, a singular covariance matrix, weights that
/// cannot be normalized, or a benchmark named like the portfolio.
pub fn run_tangency_pipeline(
    workbook: &Workbook,
    config: &PipelineConfig,
) -> Result<TangencyAnalysis> {
    let returns = &workbook.returns;
    info!(
        assets = returns.n_assets(),
        periods = returns.n_periods(),
        annualization = %config.annualization,
        "running tangency pipeline"
    );

    let asset_metrics = return_metrics(returns, config.annualization)?;

    let estimator = config.covariance.estimator()?;
    let portfolio =
        TangencyPortfolio::from_returns_with(returns, config.return_basis, estimator.as_ref())?;
    let weights = portfolio.normalized(config.normalization)?;

    let realized = portfolio_returns(returns, &weights)?;
    let mut series = vec![realized.clone()];
    if let Some(benchmark) = &workbook.benchmark {
        series.push(benchmark.clone());
    }
    let performance = performance_metrics(&series, config.annualization)?;

    if let Some(m) = performance.get(PORTFOLIO_NAME) {
        info!(mean = m.mean, vol = m.vol, sharpe = m.sharpe, "portfolio performance");
    }

    Ok(TangencyAnalysis {
        config: *config,
        asset_metrics,
        portfolio,
        weights,
        portfolio_returns: realized,
        performance,
    })
}
