//! Order management: validation, status tracking and optional routing.

use crate::{
    book::{LimitOrderBook, MatchingEngine},
    error::OmsError,
    order::{ExecutionReport, Order},
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Lifecycle status of a managed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Validated and live
    #[display("accepted")]
    Accepted,
    /// Some quantity has traded
    #[display("partially_filled")]
    PartiallyFilled,
    /// All quantity has traded
    #[display("filled")]
    Filled,
    /// Withdrawn by the client
    #[display("canceled")]
    Canceled,
}

impl OrderStatus {
    /// Whether the order can no longer trade.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled)
    }
}

/// What an acknowledgement confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AckKind {
    /// New order accepted
    #[display("accepted")]
    Accepted,
    /// Cancel applied
    #[display("canceled")]
    Canceled,
    /// Amendment applied
    #[display("amended")]
    Amended,
}

/// Response to a client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Order id
    pub order_id: String,
    /// Request type confirmed
    pub kind: AckKind,
    /// Order status after the request and any resulting fills
    pub status: OrderStatus,
    /// Time the request took effect
    pub timestamp: DateTime<Utc>,
    /// Fills generated by routing the request
    pub reports: Vec<ExecutionReport>,
}

/// An order as tracked by the OMS.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedOrder {
    /// Order as last accepted or amended (full quantity)
    pub order: Order,
    /// Quantity filled so far
    pub filled: u64,
    /// Current status
    pub status: OrderStatus,
}

impl ManagedOrder {
    /// Quantity still open.
    pub const fn remaining(&self) -> u64 {
        self.order.quantity.saturating_sub(self.filled)
    }
}

/// Validates, stores and optionally routes orders to a matching engine.
#[derive(Debug, Clone)]
pub struct OrderManagementSystem<E = LimitOrderBook> {
    orders: HashMap<String, ManagedOrder>,
    engine: Option<E>,
}

impl<E> Default for OrderManagementSystem<E> {
    fn default() -> Self {
        Self {
            orders: HashMap::new(),
            engine: None,
        }
    }
}

impl OrderManagementSystem<LimitOrderBook> {
    /// OMS without routing; fills are applied with [`Self::apply_report`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: MatchingEngine> OrderManagementSystem<E> {
    /// OMS that forwards accepted orders to `engine`.
    pub fn with_engine(engine: E) -> Self {
        Self {
            orders: HashMap::new(),
            engine: Some(engine),
        }
    }

    /// Routing target, if any.
    pub const fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Validate and store a new order, routing it when an engine is set.
    pub fn new_order(&mut self, order: Order) -> Result<Acknowledgement, OmsError> {
        order.validate()?;
        if self.orders.contains_key(&order.id) {
            return Err(crate::error::OrderError::DuplicateOrderId(order.id).into());
        }

        let order_id = order.id.clone();
        let timestamp = order.timestamp;
        let reports = match self.engine.as_mut() {
            Some(engine) => engine.submit(order.clone())?,
            None => Vec::new(),
        };

        self.orders.insert(
            order_id.clone(),
            ManagedOrder {
                order,
                filled: 0,
                status: OrderStatus::Accepted,
            },
        );
        self.apply_reports(&reports);

        let status = self.status(&order_id).unwrap_or(OrderStatus::Accepted);
        info!(order_id = %order_id, %status, fills = reports.len() / 2, "order accepted");

        Ok(Acknowledgement {
            order_id,
            kind: AckKind::Accepted,
            status,
            timestamp,
            reports,
        })
    }

    /// Cancel an open order.
    pub fn cancel_order(&mut self, order_id: &str) -> Result<Acknowledgement, OmsError> {
        let managed = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| OmsError::NotFound(order_id.to_string()))?;

        if managed.status.is_terminal() {
            return Err(OmsError::InvalidState {
                order_id: order_id.to_string(),
                action: "cancel",
                status: managed.status.to_string(),
            });
        }

        managed.status = OrderStatus::Canceled;
        if let Some(engine) = self.engine.as_mut() {
            if engine.cancel(order_id).is_none() {
                debug!(order_id, "canceled order was not resting in the book");
            }
        }

        info!(order_id, "order canceled");
        Ok(Acknowledgement {
            order_id: order_id.to_string(),
            kind: AckKind::Canceled,
            status: OrderStatus::Canceled,
            timestamp: Utc::now(),
            reports: Vec::new(),
        })
    }

    /// Change quantity and/or price of an accepted order.
    ///
    /// The order loses time priority. A routed order is pulled from the
    /// book and resubmitted, which may trade immediately.
    pub fn amend_order(
        &mut self,
        order_id: &str,
        new_qty: Option<u64>,
        new_price: Option<f64>,
    ) -> Result<Acknowledgement, OmsError> {
        let managed = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| OmsError::NotFound(order_id.to_string()))?;

        if managed.status != OrderStatus::Accepted {
            return Err(OmsError::InvalidState {
                order_id: order_id.to_string(),
                action: "amend",
                status: managed.status.to_string(),
            });
        }

        let mut amended = managed.order.clone();
        if let Some(qty) = new_qty {
            amended.quantity = qty;
        }
        if let Some(price) = new_price {
            amended.order_type = amended
                .order_type
                .with_price(price)
                .ok_or_else(|| OmsError::PriceNotAmendable(order_id.to_string()))?;
        }
        amended.timestamp = Utc::now().max(managed.order.timestamp);
        amended.validate()?;

        let timestamp = amended.timestamp;
        managed.order = amended.clone();

        let reports = match self.engine.as_mut() {
            Some(engine) => {
                if engine.cancel(order_id).is_none() {
                    warn!(order_id, "amended order was not resting in the book");
                }
                engine.submit(amended)?
            }
            None => Vec::new(),
        };
        self.apply_reports(&reports);

        let status = self.status(order_id).unwrap_or(OrderStatus::Accepted);
        info!(order_id, ?new_qty, ?new_price, "order amended");
        Ok(Acknowledgement {
            order_id: order_id.to_string(),
            kind: AckKind::Amended,
            status,
            timestamp,
            reports,
        })
    }
}

impl<E> OrderManagementSystem<E> {
    /// Update fill state from an execution report.
    ///
    /// Reports for unknown orders (e.g. the other side of a match placed
    /// outside the OMS) are ignored.
    pub fn apply_report(&mut self, report: &ExecutionReport) {
        let Some(managed) = self.orders.get_mut(&report.order_id) else {
            debug!(order_id = %report.order_id, "report for unmanaged order");
            return;
        };
        managed.filled = (managed.filled + report.filled_qty).min(managed.order.quantity);
        managed.status = if managed.filled >= managed.order.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    fn apply_reports(&mut self, reports: &[ExecutionReport]) {
        for report in reports {
            self.apply_report(report);
        }
    }

    /// Current status of an order.
    pub fn status(&self, order_id: &str) -> Option<OrderStatus> {
        self.orders.get(order_id).map(|m| m.status)
    }

    /// Tracked order by id.
    pub fn get(&self, order_id: &str) -> Option<&ManagedOrder> {
        self.orders.get(order_id)
    }

    /// Orders that can still trade.
    pub fn open_orders(&self) -> impl Iterator<Item = &ManagedOrder> {
        self.orders.values().filter(|m| !m.status.is_terminal())
    }

    /// Number of tracked orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether no orders are tracked.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::OrderError,
        order::{OrderType, Side},
    };
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn limit(id: &str, side: Side, qty: u64, price: f64) -> Order {
        Order::limit(id, "AAPL", side, qty, price, t0())
    }

    #[test]
    fn test_new_order_accepted() {
        let mut oms = OrderManagementSystem::new();
        let ack = oms.new_order(limit("1", Side::Buy, 10, 100.0)).unwrap();
        assert_eq!(ack.kind, AckKind::Accepted);
        assert_eq!(ack.status, OrderStatus::Accepted);
        assert_eq!(ack.timestamp, t0());
        assert!(ack.reports.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let mut oms = OrderManagementSystem::new();
        assert!(matches!(
            oms.new_order(limit("1", Side::Buy, 0, 100.0)),
            Err(OmsError::Order(OrderError::ZeroQuantity { .. }))
        ));
        assert!(matches!(
            oms.new_order(limit("2", Side::Buy, 1, -1.0)),
            Err(OmsError::Order(OrderError::InvalidPrice { .. }))
        ));
        oms.new_order(limit("3", Side::Buy, 1, 1.0)).unwrap();
        assert!(matches!(
            oms.new_order(limit("3", Side::Buy, 1, 1.0)),
            Err(OmsError::Order(OrderError::DuplicateOrderId(_)))
        ));
        assert!(oms.get("1").is_none());
    }

    #[test]
    fn test_cancel_rules() {
        let mut oms = OrderManagementSystem::new();
        assert!(matches!(oms.cancel_order("nope"), Err(OmsError::NotFound(_))));

        oms.new_order(limit("1", Side::Buy, 10, 100.0)).unwrap();
        let ack = oms.cancel_order("1").unwrap();
        assert_eq!(ack.status, OrderStatus::Canceled);
        assert!(matches!(
            oms.cancel_order("1"),
            Err(OmsError::InvalidState { action: "cancel", .. })
        ));
    }

    #[test]
    fn test_amend_rules() {
        let mut oms = OrderManagementSystem::new();
        assert!(matches!(
            oms.amend_order("nope", Some(1), None),
            Err(OmsError::NotFound(_))
        ));

        oms.new_order(limit("1", Side::Buy, 10, 100.0)).unwrap();
        let ack = oms.amend_order("1", Some(20), Some(101.0)).unwrap();
        assert_eq!(ack.kind, AckKind::Amended);
        let managed = oms.get("1").unwrap();
        assert_eq!(managed.order.quantity, 20);
        assert_eq!(managed.order.order_type, OrderType::Limit { price: 101.0 });
        assert!(managed.order.timestamp >= t0());

        assert!(matches!(
            oms.amend_order("1", Some(0), None),
            Err(OmsError::Order(OrderError::ZeroQuantity { .. }))
        ));

        oms.new_order(Order::market("2", "AAPL", Side::Sell, 5, t0()))
            .unwrap();
        assert!(matches!(
            oms.amend_order("2", None, Some(99.0)),
            Err(OmsError::PriceNotAmendable(_))
        ));

        oms.cancel_order("1").unwrap();
        assert!(matches!(
            oms.amend_order("1", Some(5), None),
            Err(OmsError::InvalidState { action: "amend", .. })
        ));
    }

    #[test]
    fn test_apply_report_updates_status() {
        let mut oms = OrderManagementSystem::new();
        let order = limit("1", Side::Buy, 10, 100.0);
        oms.new_order(order.clone()).unwrap();

        oms.apply_report(&ExecutionReport::for_fill(&order, 10, 4, 100.0, t0()));
        assert_eq!(oms.status("1"), Some(OrderStatus::PartiallyFilled));
        assert_eq!(oms.get("1").unwrap().remaining(), 6);

        oms.apply_report(&ExecutionReport::for_fill(&order, 6, 6, 100.0, t0()));
        assert_eq!(oms.status("1"), Some(OrderStatus::Filled));
        assert!(matches!(
            oms.cancel_order("1"),
            Err(OmsError::InvalidState { .. })
        ));
        assert_eq!(oms.open_orders().count(), 0);
    }
}
