//! `tangent book`: replay an order file through the limit order book.
//!
//! Each CSV row is a request against the OMS:
//!
//! ```text
//! action,id,timestamp,symbol,side,type,quantity,price
//! new,A1,2024-01-02T09:30:00Z,AAPL,sell,limit,100,10.0
//! new,B1,2024-01-02T09:30:01Z,AAPL,buy,market,60,
//! amend,A1,,,,,80,
//! cancel,A1,,,,,,
//! ```
//!
//! `action` defaults to `new`; `symbol` defaults to the book's symbol.

use crate::{
    error::CliError,
    output::{OutputFormat, OutputOptions},
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io, path::PathBuf};
use tangent::{
    data::parse_timestamp,
    output::BookSummary,
    trading::{
        Acknowledgement, BookDepth, LimitOrderBook, Order, OrderManagementSystem, OrderType,
        PnlSummary, PositionTracker, Side,
    },
};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub(crate) struct BookArgs {
    /// Order file to replay
    orders: PathBuf,

    /// Symbol of the book (default: symbol of the first new order)
    #[arg(long)]
    symbol: Option<String>,

    /// Only book fills of orders whose id starts with this prefix
    /// (default: the incoming order of each request)
    #[arg(long)]
    account: Option<String>,

    /// Price levels per side to show
    #[arg(long, default_value_t = 5)]
    depth: usize,

    /// Override the starting cash
    #[arg(long)]
    starting_cash: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    #[default]
    New,
    Cancel,
    Amend,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    #[serde(default)]
    action: Option<Action>,
    id: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(rename = "type", default)]
    order_type: Option<String>,
    #[serde(default)]
    quantity: Option<u64>,
    #[serde(default)]
    price: Option<f64>,
}

/// One parsed request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Request {
    New(Order),
    Cancel(String),
    Amend {
        id: String,
        quantity: Option<u64>,
        price: Option<f64>,
    },
}

impl Request {
    fn from_row(row: OrderRow, default_symbol: Option<&str>) -> Result<Self, CliError> {
        let missing = |field: &str| {
            CliError::InvalidArgument(format!("order {}: missing {field}", row.id))
        };
        match row.action.unwrap_or_default() {
            Action::Cancel => Ok(Self::Cancel(row.id)),
            Action::Amend => Ok(Self::Amend {
                id: row.id,
                quantity: row.quantity,
                price: row.price,
            }),
            Action::New => {
                let symbol = row
                    .symbol
                    .as_deref()
                    .or(default_symbol)
                    .ok_or_else(|| missing("symbol"))?
                    .to_string();
                let side: Side = row.side.as_deref().ok_or_else(|| missing("side"))?.parse()?;
                let order_type = OrderType::parse(
                    row.order_type.as_deref().unwrap_or("limit"),
                    row.price,
                )?;
                let quantity = row.quantity.ok_or_else(|| missing("quantity"))?;
                let timestamp =
                    parse_timestamp(row.timestamp.as_deref().ok_or_else(|| missing("timestamp"))?)?;
                Ok(Self::New(Order::new(row.id, symbol, side, quantity, order_type, timestamp)))
            }
        }
    }

    fn symbol(&self) -> Option<&str> {
        match self {
            Self::New(order) => Some(&order.symbol),
            _ => None,
        }
    }
}

/// Parse an order file.
pub(crate) fn read_orders<R: io::Read>(
    reader: R,
    default_symbol: Option<&str>,
) -> Result<Vec<Request>, CliError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv.deserialize::<OrderRow>()
        .map(|row| Request::from_row(row?, default_symbol))
        .collect()
}

/// Result of a replay.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Replay {
    pub(crate) symbol: String,
    pub(crate) acks: Vec<Acknowledgement>,
    pub(crate) depth: BookDepth,
    pub(crate) pnl: PnlSummary,
    #[serde(skip)]
    pub(crate) tracker: PositionTracker,
}

impl Replay {
    pub(crate) fn summary(&self) -> BookSummary {
        BookSummary::new(&self.symbol, &self.acks, self.depth.clone(), self.pnl.clone())
    }
}

/// Run every request through an OMS routed to a fresh book.
///
/// Fills are booked for the incoming order of each request, or for every
/// order whose id starts with `account` when one is given. Open positions
/// are marked at the last trade price.
pub(crate) fn replay(
    requests: &[Request],
    symbol: &str,
    starting_cash: f64,
    account: Option<&str>,
    levels: usize,
) -> Result<Replay, CliError> {
    let mut oms = OrderManagementSystem::with_engine(LimitOrderBook::new(symbol));
    let mut tracker = PositionTracker::new(starting_cash);
    let mut marks = HashMap::new();
    let mut acks = Vec::with_capacity(requests.len());

    for request in requests {
        let ack = match request {
            Request::New(order) => oms.new_order(order.clone())?,
            Request::Cancel(id) => oms.cancel_order(id)?,
            Request::Amend { id, quantity, price } => oms.amend_order(id, *quantity, *price)?,
        };

        for report in &ack.reports {
            marks.insert(report.symbol.clone(), report.price);
            let ours = match account {
                Some(prefix) => report.order_id.starts_with(prefix),
                None => report.order_id == ack.order_id,
            };
            if ours {
                tracker.update(report);
            }
        }
        acks.push(ack);
    }

    let depth = oms.engine().map(|book| book.depth(levels)).unwrap_or_default();
    let pnl = tracker.pnl_summary(&marks);
    info!(
        requests = requests.len(),
        fills = tracker.blotter().len(),
        open = oms.open_orders().count(),
        "replay complete"
    );
    Ok(Replay {
        symbol: symbol.to_string(),
        acks,
        depth,
        pnl,
        tracker,
    })
}

pub(crate) fn run(
    args: &BookArgs,
    starting_cash: f64,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let file = std::fs::File::open(&args.orders).map_err(|e| {
        CliError::InvalidArgument(format!("cannot open {}: {e}", args.orders.display()))
    })?;
    let requests = read_orders(file, args.symbol.as_deref())?;

    let symbol = match args.symbol.as_deref().or_else(|| requests.iter().find_map(Request::symbol)) {
        Some(symbol) => symbol.to_string(),
        None => {
            return Err(CliError::InvalidArgument(
                "no symbol given and the order file has no new orders".to_string(),
            ));
        }
    };
    if requests.is_empty() {
        warn!(path = %args.orders.display(), "order file is empty");
    }

    let result = replay(
        &requests,
        &symbol,
        args.starting_cash.unwrap_or(starting_cash),
        args.account.as_deref(),
        args.depth,
    )?;

    println!("{}", render(&result, output.format)?);
    output.export(&result.tracker.blotter().to_vec())?;
    Ok(())
}

fn render(replay: &Replay, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(replay)?,
        OutputFormat::Text => replay.summary().to_ascii_table(),
        OutputFormat::Markdown => replay.summary().to_markdown(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tangent::trading::OrderStatus;

    const ORDERS: &str = "\
action,id,timestamp,symbol,side,type,quantity,price
new,MM-1,2024-01-02T09:30:00Z,AAPL,sell,limit,100,10.0
new,MM-2,2024-01-02T09:30:01Z,AAPL,buy,limit,50,9.5
new,C-1,2024-01-02T09:30:02Z,AAPL,buy,market,60,
amend,MM-2,,,,,50,9.8
cancel,MM-1,,,,,,
";

    #[test]
    fn test_read_orders() {
        let requests = read_orders(ORDERS.as_bytes(), None).unwrap();
        assert_eq!(requests.len(), 5);
        assert!(matches!(&requests[2], Request::New(o) if o.order_type == OrderType::Market));
        assert_eq!(
            requests[3],
            Request::Amend {
                id: "MM-2".to_string(),
                quantity: Some(50),
                price: Some(9.8)
            }
        );
        assert_eq!(requests[4], Request::Cancel("MM-1".to_string()));
    }

    #[test]
    fn test_missing_columns_default() {
        let csv = "id,timestamp,side,quantity,price\nX,2024-01-02,buy,10,5.0\n";
        let requests = read_orders(csv.as_bytes(), Some("MSFT")).unwrap();
        let Request::New(order) = &requests[0] else {
            panic!("expected a new order");
        };
        assert_eq!(order.symbol, "MSFT");
        assert_eq!(order.order_type, OrderType::Limit { price: 5.0 });
    }

    #[test]
    fn test_new_order_without_side_is_rejected() {
        let csv = "id,timestamp,symbol,quantity\nX,2024-01-02,AAPL,10\n";
        assert!(matches!(
            read_orders(csv.as_bytes(), None),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[rstest]
    #[case(None, 60, -600.0)]
    #[case(Some("MM-"), -60, 600.0)]
    fn test_replay_books_chosen_fills(
        #[case] account: Option<&str>,
        #[case] position: i64,
        #[case] cash_change: f64,
    ) {
        let requests = read_orders(ORDERS.as_bytes(), None).unwrap();
        let result = replay(&requests, "AAPL", 10_000.0, account, 5).unwrap();

        assert_eq!(result.acks[2].reports.len(), 2);
        assert_eq!(result.acks[4].status, OrderStatus::Canceled);
        assert_eq!(result.pnl.positions["AAPL"], position);
        assert_eq!(result.pnl.current_cash, 10_000.0 + cash_change);
        // Marked at the last trade, so nothing is unrealized
        assert_eq!(result.pnl.unrealized_pnl, 0.0);

        // Only the amended bid is left
        assert!(result.depth.asks.is_empty());
        assert_eq!(result.depth.bids.len(), 1);
        assert_eq!(result.depth.bids[0].price, 9.8);
    }

    #[test]
    fn test_replay_rejects_unknown_cancel() {
        let requests = vec![Request::Cancel("nope".to_string())];
        assert!(matches!(
            replay(&requests, "AAPL", 0.0, None, 5),
            Err(CliError::Oms(_))
        ));
    }

    #[test]
    fn test_render_text_sections() {
        let requests = read_orders(ORDERS.as_bytes(), None).unwrap();
        let result = replay(&requests, "AAPL", 10_000.0, None, 5).unwrap();
        let text = render(&result, OutputFormat::Text).unwrap();
        assert!(text.contains("Order book: AAPL"));
        assert!(text.contains("Cash:               9400.00"));
        let markdown = render(&result, OutputFormat::Markdown).unwrap();
        assert!(markdown.contains("| 50 | 9.8000 |  |  |"));
        let json = render(&result, OutputFormat::Json).unwrap();
        assert!(json.contains("\"acks\""));
        assert!(!json.contains("tracker"));
    }
}
