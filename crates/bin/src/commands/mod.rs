//! Subcommand implementations.

pub(crate) mod backtest;
pub(crate) mod book;
pub(crate) mod tangency;
