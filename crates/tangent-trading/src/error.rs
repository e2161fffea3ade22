//! Error types for order handling.

use thiserror::Error;

/// Errors raised by order validation and the order book.
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    /// Quantity must be positive
    #[error("Order {order_id}: quantity must be greater than 0")]
    ZeroQuantity {
        /// Offending order
        order_id: String,
    },

    /// Limit and stop prices must be finite and positive
    #[error("Order {order_id}: invalid price {price}")]
    InvalidPrice {
        /// Offending order
        order_id: String,
        /// Supplied price
        price: f64,
    },

    /// Order sent to a book for another symbol
    #[error("Order {order_id} is for {actual}, book trades {expected}")]
    SymbolMismatch {
        /// Offending order
        order_id: String,
        /// Symbol of the book
        expected: String,
        /// Symbol of the order
        actual: String,
    },

    /// An order with the same id is already resting
    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(String),

    /// Unrecognized side or order type text
    #[error("Cannot parse {field}: '{value}'")]
    Parse {
        /// Field being parsed
        field: &'static str,
        /// Raw text
        value: String,
    },
}

/// Errors raised by the order management system.
#[derive(Debug, Error, PartialEq)]
pub enum OmsError {
    /// Order failed validation or was rejected by the book
    #[error(transparent)]
    Order(#[from] OrderError),

    /// No order with this id
    #[error("Order not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the order's current status
    #[error("Cannot {action} order {order_id} in status {status}")]
    InvalidState {
        /// Order id
        order_id: String,
        /// Attempted operation
        action: &'static str,
        /// Current status
        status: String,
    },

    /// Price amendment on an order without a price
    #[error("Only limit or stop orders can change price (order {0})")]
    PriceNotAmendable(String),
}
