//! Order book scenarios and the OMS -> book -> tracker flow.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use tangent_trading::{
    FillStatus, LimitOrderBook, Order, OrderManagementSystem, OrderStatus, PositionTracker, Side,
};

fn t(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).unwrap() + Duration::seconds(seconds)
}

fn limit(id: &str, side: Side, qty: u64, price: f64, at: i64) -> Order {
    Order::limit(id, "AAPL", side, qty, price, t(at))
}

fn snapshot<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<(String, f64, u64)> {
    orders
        .map(|o| (o.id.clone(), o.price().unwrap_or(0.0), o.quantity))
        .collect()
}

fn bids(book: &LimitOrderBook) -> Vec<(String, f64, u64)> {
    snapshot(book.bids())
}

fn asks(book: &LimitOrderBook) -> Vec<(String, f64, u64)> {
    snapshot(book.asks())
}

#[test]
fn test_basic_cross_then_market_sweep() {
    let mut book = LimitOrderBook::new("AAPL");
    assert!(book.add_order(limit("1", Side::Buy, 10, 150.0, 0)).unwrap().is_empty());

    let reports = book.add_order(limit("2", Side::Sell, 5, 149.0, 1)).unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.price == 150.0 && r.filled_qty == 5));
    assert_eq!(bids(&book), vec![("1".to_string(), 150.0, 5)]);

    let reports = book
        .add_order(Order::market("3", "AAPL", Side::Sell, 5, t(2)))
        .unwrap();
    assert_eq!(reports[0].status, FillStatus::Filled);
    assert_eq!(reports[1].status, FillStatus::Filled);
    assert!(book.is_empty());
}

#[test]
fn test_time_priority_at_same_price() {
    let mut book = LimitOrderBook::new("AAPL");
    book.add_order(limit("B1", Side::Buy, 20, 100.0, 0)).unwrap();
    book.add_order(limit("B2", Side::Buy, 30, 100.0, 1)).unwrap();
    book.add_order(limit("B3", Side::Buy, 15, 100.0, 2)).unwrap();

    let reports = book.add_order(limit("S1", Side::Sell, 35, 100.0, 3)).unwrap();
    let summary: Vec<(&str, u64, FillStatus)> = reports
        .iter()
        .map(|r| (r.order_id.as_str(), r.filled_qty, r.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("S1", 20, FillStatus::PartialFill),
            ("B1", 20, FillStatus::Filled),
            ("S1", 15, FillStatus::Filled),
            ("B2", 15, FillStatus::PartialFill),
        ]
    );
    assert_eq!(
        bids(&book),
        vec![("B2".to_string(), 100.0, 15), ("B3".to_string(), 100.0, 15)]
    );
    assert!(asks(&book).is_empty());
}

#[test]
fn test_partial_fills_on_both_sides() {
    let mut book = LimitOrderBook::new("AAPL");
    book.add_order(limit("A1", Side::Sell, 10, 105.0, 0)).unwrap();
    book.add_order(limit("A2", Side::Sell, 15, 106.0, 1)).unwrap();
    book.add_order(limit("A3", Side::Sell, 20, 107.0, 2)).unwrap();
    book.add_order(limit("B1", Side::Buy, 25, 104.0, 3)).unwrap();
    book.add_order(limit("B2", Side::Buy, 30, 103.0, 4)).unwrap();

    let reports = book.add_order(limit("BB1", Side::Buy, 40, 106.5, 5)).unwrap();
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].price, 105.0);
    assert_eq!(reports[2].price, 106.0);
    assert!(reports.iter().all(|r| r.timestamp == t(5)));

    assert_eq!(
        bids(&book),
        vec![
            ("BB1".to_string(), 106.5, 15),
            ("B1".to_string(), 104.0, 25),
            ("B2".to_string(), 103.0, 30),
        ]
    );
    assert_eq!(asks(&book), vec![("A3".to_string(), 107.0, 20)]);
    assert_eq!(book.spread(), Some(0.5));
}

#[test]
fn test_market_order_consumes_multiple_levels() {
    let mut book = LimitOrderBook::new("AAPL");
    for (i, (qty, price)) in [(100, 200.0), (200, 200.5), (150, 201.0), (300, 201.5)]
        .into_iter()
        .enumerate()
    {
        book.add_order(limit(&format!("DA{}", i + 1), Side::Sell, qty, price, i as i64))
            .unwrap();
    }

    let reports = book
        .add_order(Order::market("HMB1", "AAPL", Side::Buy, 500, t(10)))
        .unwrap();
    let aggressor: Vec<(u64, f64)> = reports
        .iter()
        .filter(|r| r.order_id == "HMB1")
        .map(|r| (r.filled_qty, r.price))
        .collect();
    assert_eq!(aggressor, vec![(100, 200.0), (200, 200.5), (150, 201.0), (50, 201.5)]);
    assert_eq!(reports.last().map(|r| r.status), Some(FillStatus::PartialFill));
    assert_eq!(reports[reports.len() - 2].status, FillStatus::Filled);
    assert_eq!(asks(&book), vec![("DA4".to_string(), 201.5, 250)]);
}

#[test]
fn test_routed_oms_updates_statuses_and_positions() {
    let mut oms = OrderManagementSystem::with_engine(LimitOrderBook::new("AAPL"));
    let mut tracker = PositionTracker::new(100_000.0);

    let ack = oms.new_order(limit("ASK", Side::Sell, 10, 101.0, 0)).unwrap();
    assert_eq!(ack.status, OrderStatus::Accepted);

    let ack = oms.new_order(limit("BID", Side::Buy, 4, 102.0, 1)).unwrap();
    assert_eq!(ack.status, OrderStatus::Filled);
    assert_eq!(ack.reports.len(), 2);
    assert_eq!(oms.status("ASK"), Some(OrderStatus::PartiallyFilled));

    for report in &ack.reports {
        tracker.update(report);
    }
    // Both legs booked in one tracker: net flat, cash unchanged
    assert_eq!(tracker.position("AAPL"), 0);
    assert_eq!(tracker.cash(), 100_000.0);

    oms.cancel_order("ASK").unwrap();
    assert!(oms.engine().is_some_and(|book| book.is_empty()));
}

#[test]
fn test_amend_requeues_behind_same_price() {
    let mut oms = OrderManagementSystem::with_engine(LimitOrderBook::new("AAPL"));
    oms.new_order(limit("first", Side::Buy, 5, 100.0, 0)).unwrap();
    oms.new_order(limit("second", Side::Buy, 5, 100.0, 1)).unwrap();

    oms.amend_order("first", Some(8), None).unwrap();
    let book = oms.engine().unwrap();
    let order: Vec<&str> = book.bids().map(|o| o.id.as_str()).collect();
    assert_eq!(order, vec!["second", "first"]);
    assert_eq!(book.get("first").unwrap().quantity, 8);
}

#[test]
fn test_amend_price_through_the_book_trades() {
    let mut oms = OrderManagementSystem::with_engine(LimitOrderBook::new("AAPL"));
    let mut tracker = PositionTracker::new(0.0);

    oms.new_order(limit("ASK", Side::Sell, 5, 101.0, 0)).unwrap();
    oms.new_order(limit("BID", Side::Buy, 5, 99.0, 1)).unwrap();
    let ack = oms.amend_order("BID", None, Some(101.0)).unwrap();

    assert_eq!(ack.status, OrderStatus::Filled);
    assert_eq!(oms.status("ASK"), Some(OrderStatus::Filled));
    for report in ack.reports.iter().filter(|r| r.order_id == "BID") {
        tracker.update(report);
    }
    let marks = HashMap::from([("AAPL".to_string(), 103.0)]);
    assert_eq!(tracker.pnl_summary(&marks).unrealized_pnl, 10.0);
}
