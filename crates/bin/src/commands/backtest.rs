//! `tangent backtest`: replay a rule-based strategy over stored prices.

use crate::{
    error::CliError,
    output::{OutputFormat, OutputOptions},
    settings::BacktestSettings,
};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tangent::{
    backtest::{
        BacktestConfig, BacktestError, BacktestResult, MeanReversion, PairsArbitrage, Strategy, TrendFollowing,
    },
    data::{PriceHistory, PriceStore, parse_timestamp},
    output::{BacktestSummary, export_frame},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StrategyKind {
    /// Moving-average crossover
    Trend,
    /// Bollinger band mean reversion
    MeanReversion,
    /// Two-asset spread trading
    Pairs,
}

#[derive(Debug, Args)]
pub(crate) struct BacktestArgs {
    /// Strategy to run
    #[arg(value_enum)]
    strategy: StrategyKind,

    /// Symbol(s) to trade; pairs takes two
    #[arg(long = "symbol", required = true)]
    symbols: Vec<String>,

    /// Directory holding `<SYMBOL>.csv` price files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// First timestamp to include (date or RFC 3339)
    #[arg(long)]
    start: Option<String>,

    /// Last timestamp to include (date or RFC 3339)
    #[arg(long)]
    end: Option<String>,

    /// Override the maximum absolute position
    #[arg(long)]
    max_position: Option<u64>,

    /// Override the starting cash
    #[arg(long)]
    starting_cash: Option<f64>,

    /// Write the signal table to this CSV file
    #[arg(long)]
    signals: Option<PathBuf>,
}

impl BacktestArgs {
    pub(crate) fn apply(&self, mut config: BacktestConfig) -> BacktestConfig {
        if let Some(max_position) = self.max_position {
            config.risk.max_position = max_position;
        }
        if let Some(cash) = self.starting_cash {
            config.starting_cash = cash;
        }
        config
    }

    fn strategy(&self, settings: &BacktestSettings) -> Result<Box<dyn Strategy>, CliError> {
        Ok(match self.strategy {
            StrategyKind::Trend => Box::new(TrendFollowing::new(settings.trend)?),
            StrategyKind::MeanReversion => Box::new(MeanReversion::new(settings.mean_reversion)),
            StrategyKind::Pairs => Box::new(PairsArbitrage::new(settings.pairs)?),
        })
    }

    fn load(&self, store: &mut PriceStore) -> Result<Vec<PriceHistory>, CliError> {
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let end = self.end.as_deref().map(parse_timestamp).transpose()?;

        self.symbols
            .iter()
            .map(|symbol| {
                let history = store.history(symbol)?;
                let (Some(first), Some(last)) = (history.bars().first(), history.last()) else {
                    return Ok(history.clone());
                };
                let start = start.unwrap_or(first.timestamp);
                let end = end.unwrap_or(last.timestamp);
                Ok(history.between(start, end)?)
            })
            .collect()
    }
}

pub(crate) fn run(
    args: &BacktestArgs,
    settings: &BacktestSettings,
    data_dir: PathBuf,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let strategy = args.strategy(settings)?;
    let config = args.apply(settings.run);

    let mut store = PriceStore::new(args.data_dir.clone().unwrap_or(data_dir));
    let prices = args.load(&mut store)?;
    let result = strategy.run(&prices, &config)?;

    println!("{}", render(&result, output.format)?);

    output.export(&result)?;
    if let Some(path) = &args.signals {
        let mut frame = result.signals_frame().map_err(BacktestError::from)?;
        export_frame(&mut frame, path)?;
    }
    Ok(())
}

fn render(result: &BacktestResult, format: OutputFormat) -> Result<String, CliError> {
    let summary = BacktestSummary::from(result);
    Ok(match format {
        OutputFormat::Text => summary.to_ascii_table(),
        OutputFormat::Markdown => summary.to_markdown(),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    })
}
