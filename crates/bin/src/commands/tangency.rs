//! `tangent tangency`: metrics, tangency weights and portfolio performance.

use crate::{
    error::CliError,
    output::{OutputFormat, OutputOptions, write_export},
};
use clap::Args;
use std::path::PathBuf;
use tangent::{
    PipelineConfig, TangencyAnalysis,
    analytics::{Annualization, CovarianceMethod, Normalization, ReturnBasis},
    data::Workbook,
    run_tangency_pipeline,
};

#[derive(Debug, Args)]
pub(crate) struct TangencyArgs {
    /// Returns CSV (`date` column plus one column per asset)
    #[arg(long)]
    returns: PathBuf,

    /// Benchmark CSV (`date` plus one return column)
    #[arg(long)]
    benchmark: Option<PathBuf>,

    /// Periods per year of the return data (12 monthly, 52 weekly, 252 daily)
    #[arg(long)]
    annualization: Option<f64>,

    /// Treat returns as raw and subtract this per-period risk-free rate
    #[arg(long)]
    risk_free: Option<f64>,

    /// Rescale weights to sum to one before computing realized returns
    #[arg(long)]
    normalize: bool,

    /// Use an EWMA covariance estimate with this decay
    #[arg(long)]
    ewma_decay: Option<f64>,

    /// Write the weights to this file (`.csv` or `.json`)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Write a JSON report with every section to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl TangencyArgs {
    /// Layer command-line flags over the configured pipeline settings.
    pub(crate) fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(periods) = self.annualization {
            config.annualization = Annualization::from_periods(periods);
        }
        if let Some(risk_free) = self.risk_free {
            config.return_basis = ReturnBasis::Raw { risk_free };
        }
        if self.normalize {
            config.normalization = Normalization::SumToOne;
        }
        if let Some(decay) = self.ewma_decay {
            config.covariance = CovarianceMethod::Ewma { decay };
        }
        config
    }
}

pub(crate) fn run(
    args: &TangencyArgs,
    config: PipelineConfig,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let config = args.apply(config);
    let workbook = Workbook::load(&args.returns, args.benchmark.as_deref())?;
    let analysis = run_tangency_pipeline(&workbook, &config)?;

    println!("{}", render(&analysis, output.format)?);

    // Asset rows followed by portfolio and benchmark rows
    let mut metrics = analysis.asset_metrics.clone();
    metrics.extend(analysis.performance.clone());
    output.export(&metrics)?;

    if let Some(path) = &args.weights {
        write_export(&analysis.weights, path)?;
    }
    if let Some(path) = &args.report {
        analysis.to_report()?.write_to(path)?;
    }
    Ok(())
}

fn render(analysis: &TangencyAnalysis, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Text => [
            analysis.asset_summary().to_ascii_table(),
            analysis.weights_summary().to_ascii_table(),
            analysis.performance_summary().to_ascii_table(),
        ]
        .concat(),
        OutputFormat::Markdown => [
            "# Tangency analysis\n\n".to_string(),
            analysis.asset_summary().to_markdown(),
            analysis.weights_summary().to_markdown(),
            analysis.performance_summary().to_markdown(),
        ]
        .concat(),
        OutputFormat::Json => analysis.to_report()?.to_json()?,
    })
}
