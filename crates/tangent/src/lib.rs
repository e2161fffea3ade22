#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pipeline;

// Re-export member crates
pub use tangent_analytics as analytics;
pub use tangent_backtest as backtest;
pub use tangent_data as data;
pub use tangent_output as output;
pub use tangent_trading as trading;

pub use pipeline::{PipelineConfig, TangencyAnalysis, run_tangency_pipeline};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
