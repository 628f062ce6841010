use crate::errors::EngineError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,  // bid
    Sell, // ask
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    fn from_indicator(indicator: &str, order_number: u64) -> Result<Side, EngineError> {
        match indicator {
            "B" => Ok(Side::Buy),
            "S" => Ok(Side::Sell),
            _ => Err(EngineError::InvalidSideIndicator {
                order_number,
                indicator: indicator.to_string(),
            }),
        }
    }
}

impl fmt::Display for Side {
    /// The feed's one-letter indicator, reused verbatim on the event tape.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "B"),
            Side::Sell => write!(f, "S"),
        }
    }
}

/// Order stream action codes: 1 = add, 3 = cancel, 4 = modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Add,
    Cancel,
    Modify,
}

impl Activity {
    fn from_code(code: u8, order_number: u64) -> Result<Activity, EngineError> {
        match code {
            1 => Ok(Activity::Add),
            3 => Ok(Activity::Cancel),
            4 => Ok(Activity::Modify),
            other => Err(EngineError::UnknownActivity {
                order_number,
                activity_type: other,
            }),
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Add => write!(f, "add"),
            Activity::Cancel => write!(f, "cancel"),
            Activity::Modify => write!(f, "modify"),
        }
    }
}

/// A single order as the engine sees it. `order_number` is the stable
/// identity across modifications; `volume_original` is the live residual the
/// matcher decrements in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_number: u64,
    pub side: Side,
    pub limit_price: Decimal,
    pub volume_original: u64,
    pub volume_disclosed: u64,
    pub is_market: bool,
    pub trans_date: String,
    pub trans_time: String,
}

/// One row of the headerless NSE order feed, in wire column order. Columns
/// with no engine meaning are carried so the positional decode lines up,
/// then ignored.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct RawRecord {
    pub record_indicator: String,
    pub segment: String,
    pub order_number: u64,
    pub trans_date: String,
    pub trans_time: String,
    pub buy_sell_indicator: String,
    pub activity_type: u8,
    pub symbol: String,
    pub instrument: String,
    pub expiry_date: String,
    pub strike_price: String,
    pub option_type: String,
    pub volume_disclosed: u64,
    pub volume_original: u64,
    pub limit_price: String,
    pub trigger_price: String,
    pub mkt_flag: String,
    pub on_stop_flag: String,
    pub io_flag: String,
    pub spread_comb_type: String,
    pub algo_ind: String,
    pub client_id_flag: String,
}

impl RawRecord {
    /// Validates the engine-relevant columns and produces the dispatchable
    /// action. Market orders may carry a zero limit price (the feed does);
    /// limit orders must price strictly above zero.
    pub fn into_action(self) -> Result<(Activity, Order), EngineError> {
        let order_number = self.order_number;
        let activity = Activity::from_code(self.activity_type, order_number)?;
        let side = Side::from_indicator(self.buy_sell_indicator.trim(), order_number)?;

        let is_market = match self.mkt_flag.trim() {
            "Y" => true,
            "N" => false,
            other => {
                return Err(EngineError::InvalidMarketFlag {
                    order_number,
                    flag: other.to_string(),
                });
            }
        };

        let price_text = self.limit_price.trim();
        let limit_price =
            Decimal::from_str(price_text).map_err(|_| EngineError::MalformedPrice {
                order_number,
                price: price_text.to_string(),
            })?;
        if !is_market && limit_price <= Decimal::ZERO {
            return Err(EngineError::MalformedPrice {
                order_number,
                price: price_text.to_string(),
            });
        }

        Ok((
            activity,
            Order {
                order_number,
                side,
                limit_price,
                volume_original: self.volume_original,
                volume_disclosed: self.volume_disclosed,
                is_market,
                trans_date: self.trans_date,
                trans_time: self.trans_time,
            },
        ))
    }
}
