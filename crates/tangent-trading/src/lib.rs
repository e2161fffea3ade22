#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod book;
pub mod error;
pub mod oms;
pub mod order;
pub mod positions;

pub use book::{BookDepth, LimitOrderBook, MatchingEngine, PriceLevel};
pub use error::{OmsError, OrderError};
pub use oms::{AckKind, Acknowledgement, ManagedOrder, OrderManagementSystem, OrderStatus};
pub use order::{ExecutionReport, FillStatus, Order, OrderType, Side};
pub use positions::{BLOTTER_COLUMNS, BlotterEntry, PnlSummary, Position, PositionTracker};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
