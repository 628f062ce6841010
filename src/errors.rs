use crate::orders::Side;
use rust_decimal::Decimal;
use thiserror::Error;

/// Fatal conditions that abort the input stream. Missing orders on
/// modify/cancel and market orders hitting an empty book are tolerated and
/// only logged, so they do not appear here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unrecognized activity type {activity_type} for order {order_number}")]
    UnknownActivity {
        order_number: u64,
        activity_type: u8,
    },

    #[error("invalid buy/sell indicator {indicator:?} for order {order_number}")]
    InvalidSideIndicator {
        order_number: u64,
        indicator: String,
    },

    #[error("invalid market order flag {flag:?} for order {order_number}")]
    InvalidMarketFlag { order_number: u64, flag: String },

    #[error("cannot {action} market order {order_number}")]
    IllegalMarketOrderAction {
        order_number: u64,
        action: &'static str,
    },

    /// An empty price level was reachable from a best-price lookup. Levels
    /// must be dropped the moment their last order leaves, so this is a bug
    /// in level lifecycle management, not bad input.
    #[error("empty price level detected at {price} on {side} side")]
    EmptyLevel { side: Side, price: Decimal },

    #[error("malformed limit price {price:?} for order {order_number}")]
    MalformedPrice { order_number: u64, price: String },

    #[error("malformed transaction date {date:?} for order {order_number}")]
    InvalidDate { order_number: u64, date: String },
}
