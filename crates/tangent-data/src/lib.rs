#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod prices;
pub mod returns;

pub use error::{DataError, Result};
pub use loader::{Workbook, load_benchmark, load_return_table, parse_date, parse_timestamp};
pub use prices::{PriceBar, PriceHistory, PriceStore};
pub use returns::{ReturnSeries, ReturnTable};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
