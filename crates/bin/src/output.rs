//! Output format selection shared by all commands.

use crate::error::CliError;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use tangent::output::{ExportFormat, Exporter};

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Aligned text tables
    #[default]
    Text,
    /// Markdown tables
    Markdown,
    /// Pretty-printed JSON
    Json,
}

/// Output options common to every subcommand.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputOptions {
    pub(crate) format: OutputFormat,
    pub(crate) export: Option<PathBuf>,
}

impl OutputOptions {
    /// Export `value` to `--export` when given, picking the format from the
    /// file extension.
    pub(crate) fn export(&self, value: &dyn Exporter) -> Result<(), CliError> {
        if let Some(path) = &self.export {
            write_export(value, path)?;
        }
        Ok(())
    }
}

pub(crate) fn write_export(value: &dyn Exporter, path: &Path) -> Result<(), CliError> {
    let format = ExportFormat::from_path(path)?;
    value.export_to_file(path, format)?;
    tracing::info!(path = %path.display(), "exported results");
    Ok(())
}
