//! Layered CLI settings.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tangent::{
    PipelineConfig,
    backtest::{BacktestConfig, MeanReversionConfig, PairsConfig, TrendFollowingConfig},
};

/// Environment variable prefix, e.g. `TANGENT_LOG_LEVEL`.
pub(crate) const ENV_PREFIX: &str = "TANGENT";

/// Everything the binary can be configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// Default log filter when `RUST_LOG` is unset
    pub(crate) log_level: String,
    /// Directory holding `<SYMBOL>.csv` price files
    pub(crate) data_dir: PathBuf,
    /// Tangency pipeline settings
    pub(crate) tangency: PipelineConfig,
    /// Backtest settings
    pub(crate) backtest: BacktestSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: PathBuf::from("data"),
            tangency: PipelineConfig::default(),
            backtest: BacktestSettings::default(),
        }
    }
}

/// Shared run settings plus per-strategy parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct BacktestSettings {
    #[serde(flatten)]
    pub(crate) run: BacktestConfig,
    pub(crate) trend: TrendFollowingConfig,
    pub(crate) mean_reversion: MeanReversionConfig,
    pub(crate) pairs: PairsConfig,
}

/// `$CONFIG_DIR/tangent/config.toml`, if a config directory exists.
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tangent").join("config.toml"))
}

impl Settings {
    /// Merge defaults, the config file and `TANGENT_*` variables.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(path) = default_config_path() {
                    builder = builder.add_source(
                        File::from(path).format(FileFormat::Toml).required(false),
                    );
                }
            }
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Parse settings from a TOML string layered over the defaults.
    #[cfg(test)]
    pub(crate) fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
