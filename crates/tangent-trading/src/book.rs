//! Price-time priority limit order book.
//!
//! Resting orders are grouped into price levels. Bids are matched from the
//! highest level down, asks from the lowest up; within a level, orders keep
//! arrival order (earliest timestamp first).
//!
//! Every match produces two execution reports, aggressor first, stamped
//! with the aggressor's timestamp and priced at the resting level.

use crate::{
    error::OrderError,
    order::{ExecutionReport, Order, OrderType, Side},
};
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, trace};

type Levels = BTreeMap<OrderedFloat<f64>, VecDeque<Order>>;

/// Something orders can be routed to.
pub trait MatchingEngine {
    /// Match an incoming order and rest any eligible remainder.
    fn submit(&mut self, order: Order) -> Result<Vec<ExecutionReport>, OrderError>;

    /// Remove a resting order, returning it if it was in the book.
    fn cancel(&mut self, order_id: &str) -> Option<Order>;
}

/// Aggregated quantity at one price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price
    pub price: f64,
    /// Total resting quantity
    pub quantity: u64,
    /// Number of resting orders
    pub orders: usize,
}

/// Top-of-book snapshot, best levels first on each side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookDepth {
    /// Bid levels, highest price first
    pub bids: Vec<PriceLevel>,
    /// Ask levels, lowest price first
    pub asks: Vec<PriceLevel>,
}

/// Limit order book for a single symbol.
#[derive(Debug, Clone)]
pub struct LimitOrderBook {
    symbol: String,
    bids: Levels,
    asks: Levels,
    /// Resting order id -> (side, level)
    index: HashMap<String, (Side, OrderedFloat<f64>)>,
    last_update: Option<DateTime<Utc>>,
}

impl LimitOrderBook {
    /// Empty book for `symbol`.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: Levels::new(),
            asks: Levels::new(),
            index: HashMap::new(),
            last_update: None,
        }
    }

    /// Symbol traded in this book.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Timestamp of the last order that changed the book.
    pub const fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Handle an incoming order.
    ///
    /// Market orders sweep the opposite side until filled or the book is
    /// empty; any remainder is dropped. Limit orders match while the best
    /// opposite price satisfies the limit, then rest. Stop orders are
    /// handled as limit orders at their stop price.
    pub fn add_order(&mut self, mut order: Order) -> Result<Vec<ExecutionReport>, OrderError> {
        if order.symbol != self.symbol {
            return Err(OrderError::SymbolMismatch {
                order_id: order.id,
                expected: self.symbol.clone(),
                actual: order.symbol,
            });
        }
        order.validate()?;
        if self.index.contains_key(&order.id) {
            return Err(OrderError::DuplicateOrderId(order.id));
        }

        self.last_update = Some(order.timestamp);
        let limit = order.order_type.price();
        let reports = self.match_order(&mut order, limit);

        match order.order_type {
            OrderType::Market => {
                if order.quantity > 0 {
                    debug!(
                        order_id = %order.id,
                        unfilled = order.quantity,
                        "market order remainder dropped, book exhausted"
                    );
                }
            }
            OrderType::Limit { price } | OrderType::Stop { price } => {
                if order.quantity > 0 {
                    self.insert_resting(order, price);
                }
            }
        }

        Ok(reports)
    }

    fn match_order(&mut self, order: &mut Order, limit: Option<f64>) -> Vec<ExecutionReport> {
        let mut reports = Vec::new();

        while order.quantity > 0 {
            let entry = match order.side {
                Side::Buy => self.asks.first_entry(),
                Side::Sell => self.bids.last_entry(),
            };
            let Some(mut level) = entry else {
                break;
            };

            let level_price = level.key().into_inner();
            if let Some(limit) = limit {
                let crosses = match order.side {
                    Side::Buy => level_price <= limit,
                    Side::Sell => level_price >= limit,
                };
                if !crosses {
                    break;
                }
            }

            let queue = level.get_mut();
            while order.quantity > 0 {
                let Some(resting) = queue.front_mut() else {
                    break;
                };

                let fill_qty = order.quantity.min(resting.quantity);
                reports.push(ExecutionReport::for_fill(
                    order,
                    order.quantity,
                    fill_qty,
                    level_price,
                    order.timestamp,
                ));
                reports.push(ExecutionReport::for_fill(
                    resting,
                    resting.quantity,
                    fill_qty,
                    level_price,
                    order.timestamp,
                ));
                trace!(
                    aggressor = %order.id,
                    resting = %resting.id,
                    qty = fill_qty,
                    price = level_price,
                    "match"
                );

                order.quantity -= fill_qty;
                resting.quantity -= fill_qty;

                if resting.quantity == 0 {
                    if let Some(done) = queue.pop_front() {
                        self.index.remove(&done.id);
                    }
                }
            }

            if queue.is_empty() {
                level.remove();
            }
        }

        reports
    }

    fn insert_resting(&mut self, order: Order, price: f64) {
        let key = OrderedFloat(price);
        self.index.insert(order.id.clone(), (order.side, key));
        let queue = match order.side {
            Side::Buy => self.bids.entry(key).or_default(),
            Side::Sell => self.asks.entry(key).or_default(),
        };
        // Equal timestamps keep submission order
        let pos = queue.partition_point(|o| o.timestamp <= order.timestamp);
        queue.insert(pos, order);
    }

    /// Remove a resting order by id.
    pub fn cancel_order(&mut self, order_id: &str) -> Option<Order> {
        let (side, key) = self.index.remove(order_id)?;
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let queue = levels.get_mut(&key)?;
        let pos = queue.iter().position(|o| o.id == order_id)?;
        let removed = queue.remove(pos);
        if queue.is_empty() {
            levels.remove(&key);
        }
        removed
    }

    /// Resting order by id.
    pub fn get(&self, order_id: &str) -> Option<&Order> {
        let (side, key) = self.index.get(order_id)?;
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels.get(key)?.iter().find(|o| o.id == order_id)
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.keys().next_back().map(|p| p.into_inner())
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.keys().next().map(|p| p.into_inner())
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Midpoint of best bid and best ask.
    pub fn mid_price(&self) -> Option<f64> {
        Some(0.5 * (self.best_ask()? + self.best_bid()?))
    }

    /// Resting bids in priority order.
    pub fn bids(&self) -> impl Iterator<Item = &Order> {
        self.bids.values().rev().flatten()
    }

    /// Resting asks in priority order.
    pub fn asks(&self) -> impl Iterator<Item = &Order> {
        self.asks.values().flatten()
    }

    /// Up to `levels` aggregated price levels per side.
    pub fn depth(&self, levels: usize) -> BookDepth {
        fn aggregate<'a>(
            iter: impl Iterator<Item = (&'a OrderedFloat<f64>, &'a VecDeque<Order>)>,
            levels: usize,
        ) -> Vec<PriceLevel> {
            iter.take(levels)
                .map(|(price, queue)| PriceLevel {
                    price: price.into_inner(),
                    quantity: queue.iter().map(|o| o.quantity).sum(),
                    orders: queue.len(),
                })
                .collect()
        }

        BookDepth {
            bids: aggregate(self.bids.iter().rev(), levels),
            asks: aggregate(self.asks.iter(), levels),
        }
    }

    /// Number of resting orders.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no orders are resting.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl MatchingEngine for LimitOrderBook {
    fn submit(&mut self, order: Order) -> Result<Vec<ExecutionReport>, OrderError> {
        self.add_order(order)
    }

    fn cancel(&mut self, order_id: &str) -> Option<Order> {
        self.cancel_order(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::FillStatus;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap() + Duration::seconds(seconds)
    }

    fn limit(id: &str, side: Side, qty: u64, price: f64, at: i64) -> Order {
        Order::limit(id, "AAPL", side, qty, price, t(at))
    }

    #[test]
    fn test_non_crossing_orders_rest() {
        let mut book = LimitOrderBook::new("AAPL");
        assert!(book.add_order(limit("1", Side::Buy, 10, 99.0, 0)).unwrap().is_empty());
        assert!(book.add_order(limit("2", Side::Sell, 10, 101.0, 1)).unwrap().is_empty());
        assert_eq!(book.best_bid(), Some(99.0));
        assert_eq!(book.best_ask(), Some(101.0));
        assert_eq!(book.spread(), Some(2.0));
        assert_eq!(book.mid_price(), Some(100.0));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_trade_at_resting_price() {
        let mut book = LimitOrderBook::new("AAPL");
        book.add_order(limit("1", Side::Buy, 10, 150.0, 0)).unwrap();
        let reports = book.add_order(limit("2", Side::Sell, 5, 149.0, 1)).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].order_id, "2");
        assert_eq!(reports[0].status, FillStatus::Filled);
        assert_eq!(reports[0].price, 150.0);
        assert_eq!(reports[0].timestamp, t(1));
        assert_eq!(reports[1].order_id, "1");
        assert_eq!(reports[1].status, FillStatus::PartialFill);
        assert_eq!(book.get("1").unwrap().quantity, 5);
    }

    #[test]
    fn test_market_order_remainder_is_dropped() {
        let mut book = LimitOrderBook::new("AAPL");
        book.add_order(limit("1", Side::Buy, 5, 150.0, 0)).unwrap();
        let reports = book
            .add_order(Order::market("2", "AAPL", Side::Sell, 8, t(1)))
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].filled_qty, 5);
        assert_eq!(reports[0].status, FillStatus::PartialFill);
        assert!(book.is_empty());
    }

    #[test]
    fn test_market_order_on_empty_book() {
        let mut book = LimitOrderBook::new("AAPL");
        let reports = book
            .add_order(Order::market("1", "AAPL", Side::Buy, 8, t(0)))
            .unwrap();
        assert!(reports.is_empty());
        assert!(book.is_empty());
    }

    #[test]
    fn test_stop_order_treated_as_limit() {
        let mut book = LimitOrderBook::new("AAPL");
        book.add_order(limit("1", Side::Sell, 10, 100.0, 0)).unwrap();
        let stop = Order::new("2", "AAPL", Side::Buy, 4, OrderType::Stop { price: 100.0 }, t(1));
        let reports = book.add_order(stop).unwrap();
        assert_eq!(reports[0].filled_qty, 4);
        assert_eq!(book.get("1").unwrap().quantity, 6);
    }

    #[test]
    fn test_equal_prices_keep_arrival_order() {
        let mut book = LimitOrderBook::new("AAPL");
        book.add_order(limit("late", Side::Buy, 1, 100.0, 5)).unwrap();
        book.add_order(limit("early", Side::Buy, 1, 100.0, 1)).unwrap();
        book.add_order(limit("same", Side::Buy, 1, 100.0, 5)).unwrap();
        let ids: Vec<&str> = book.bids().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "same"]);
    }

    #[test]
    fn test_cancel_removes_empty_level() {
        let mut book = LimitOrderBook::new("AAPL");
        book.add_order(limit("1", Side::Sell, 10, 101.0, 0)).unwrap();
        book.add_order(limit("2", Side::Sell, 10, 102.0, 1)).unwrap();
        let removed = book.cancel_order("1").unwrap();
        assert_eq!(removed.id, "1");
        assert_eq!(book.best_ask(), Some(102.0));
        assert!(book.cancel_order("1").is_none());
        assert!(book.cancel_order("missing").is_none());
    }

    #[test]
    fn test_rejects_wrong_symbol_and_duplicates() {
        let mut book = LimitOrderBook::new("AAPL");
        let msft = Order::limit("1", "MSFT", Side::Buy, 1, 10.0, t(0));
        assert!(matches!(book.add_order(msft), Err(OrderError::SymbolMismatch { .. })));

        book.add_order(limit("1", Side::Buy, 1, 10.0, 0)).unwrap();
        assert!(matches!(
            book.add_order(limit("1", Side::Buy, 1, 10.0, 1)),
            Err(OrderError::DuplicateOrderId(_))
        ));
        assert!(matches!(
            book.add_order(limit("2", Side::Buy, 0, 10.0, 1)),
            Err(OrderError::ZeroQuantity { .. })
        ));
    }

    #[test]
    fn test_depth_aggregates_levels() {
        let mut book = LimitOrderBook::new("AAPL");
        book.add_order(limit("1", Side::Buy, 10, 99.0, 0)).unwrap();
        book.add_order(limit("2", Side::Buy, 5, 99.0, 1)).unwrap();
        book.add_order(limit("3", Side::Buy, 7, 98.0, 2)).unwrap();
        book.add_order(limit("4", Side::Sell, 3, 100.0, 3)).unwrap();

        let depth = book.depth(1);
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(
            depth.bids[0],
            PriceLevel {
                price: 99.0,
                quantity: 15,
                orders: 2
            }
        );
        assert_eq!(depth.asks[0].quantity, 3);
        assert_eq!(book.depth(10).bids.len(), 2);
    }
}
