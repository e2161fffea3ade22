//! Orders and execution reports.

use crate::error::OrderError;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy (bid)
    #[display("buy")]
    Buy,
    /// Sell (ask)
    #[display("sell")]
    Sell,
}

impl Side {
    /// The other side of the book.
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// +1 for buys, -1 for sells.
    pub const fn sign(&self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl FromStr for Side {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(Self::Buy),
            "sell" | "s" => Ok(Self::Sell),
            _ => Err(OrderError::Parse {
                field: "side",
                value: s.to_string(),
            }),
        }
    }
}

/// Order type; limit and stop orders carry their price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum OrderType {
    /// Execute against available liquidity, any remainder is dropped
    #[display("market")]
    Market,
    /// Execute at the limit price or better, remainder rests
    #[display("limit@{price}")]
    Limit {
        /// Limit price
        price: f64,
    },
    /// Matched as a limit order at the stop price once the caller triggers it
    #[display("stop@{price}")]
    Stop {
        /// Stop price
        price: f64,
    },
}

impl OrderType {
    /// Price carried by limit and stop orders.
    pub const fn price(&self) -> Option<f64> {
        match self {
            Self::Market => None,
            Self::Limit { price } | Self::Stop { price } => Some(*price),
        }
    }

    /// Same type with a new price; `None` for market orders.
    pub const fn with_price(&self, price: f64) -> Option<Self> {
        match self {
            Self::Market => None,
            Self::Limit { .. } => Some(Self::Limit { price }),
            Self::Stop { .. } => Some(Self::Stop { price }),
        }
    }

    /// Parse a type name with an optional price (`market`, `limit`, `stop`).
    pub fn parse(kind: &str, price: Option<f64>) -> Result<Self, OrderError> {
        let kind_lower = kind.trim().to_ascii_lowercase();
        match (kind_lower.as_str(), price) {
            ("market", _) => Ok(Self::Market),
            ("limit", Some(price)) => Ok(Self::Limit { price }),
            ("stop", Some(price)) => Ok(Self::Stop { price }),
            ("limit" | "stop", None) => Err(OrderError::Parse {
                field: "price",
                value: format!("{kind} order without a price"),
            }),
            _ => Err(OrderError::Parse {
                field: "order type",
                value: kind.to_string(),
            }),
        }
    }
}

/// A single trade instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier
    pub id: String,
    /// Instrument symbol
    pub symbol: String,
    /// Direction
    pub side: Side,
    /// Remaining quantity
    pub quantity: u64,
    /// Market, limit or stop
    pub order_type: OrderType,
    /// Arrival time, used for time priority
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// Create an order.
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: u64,
        order_type: OrderType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            quantity,
            order_type,
            timestamp,
        }
    }

    /// Market order.
    pub fn market(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(id, symbol, side, quantity, OrderType::Market, timestamp)
    }

    /// Limit order.
    pub fn limit(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: u64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(id, symbol, side, quantity, OrderType::Limit { price }, timestamp)
    }

    /// Limit or stop price.
    pub const fn price(&self) -> Option<f64> {
        self.order_type.price()
    }

    /// Check quantity and price.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::ZeroQuantity {
                order_id: self.id.clone(),
            });
        }
        if let Some(price) = self.price() {
            if !price.is_finite() || price <= 0.0 {
                return Err(OrderError::InvalidPrice {
                    order_id: self.id.clone(),
                    price,
                });
            }
        }
        Ok(())
    }
}

/// Fill status reported per execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// The fill completed the order
    #[display("filled")]
    Filled,
    /// Quantity remains after the fill
    #[display("partial_fill")]
    PartialFill,
}

/// One side of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Order that traded
    pub order_id: String,
    /// Instrument symbol
    pub symbol: String,
    /// Direction of the order
    pub side: Side,
    /// Quantity traded in this fill
    pub filled_qty: u64,
    /// Trade price
    pub price: f64,
    /// Trade time
    pub timestamp: DateTime<Utc>,
    /// Whether the order is now complete
    pub status: FillStatus,
}

impl ExecutionReport {
    /// Report a fill of `filled_qty` against an order that had `remaining`
    /// quantity before the fill.
    pub fn for_fill(
        order: &Order,
        remaining: u64,
        filled_qty: u64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let status = if filled_qty == remaining {
            FillStatus::Filled
        } else {
            FillStatus::PartialFill
        };
        Self {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            filled_qty,
            price,
            timestamp,
            status,
        }
    }

    /// Signed notional: negative for buys (cash out), positive for sells.
    pub fn cash_flow(&self) -> f64 {
        -(self.side.sign() as f64) * self.filled_qty as f64 * self.price
    }
}
