use crate::orders::{Activity, Side};
use anyhow::Context;
use rust_decimal::Decimal;
use std::io;

/// Top-of-book snapshot taken before an action mutates anything. Every event
/// the action emits shares one snapshot. Only original volumes make it onto
/// the tape; disclosed volume is tracked but not journaled at the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopOfBook {
    pub best_bid: Option<Decimal>,
    pub best_bid_volume_original: u64,
    pub best_ask: Option<Decimal>,
    pub best_ask_volume_original: u64,
}

/// Fill payload attached to an event when the action traded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeFill {
    pub price: Decimal,
    pub quantity: u64,
    pub buy_order_number: u64,
    pub sell_order_number: u64,
}

/// A journaled trade. `seq` restarts at 1 each trading day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub seq: u64,
    pub date: String,
    pub time: String,
    pub price: Decimal,
    pub quantity: u64,
    pub buy_order_number: u64,
    pub sell_order_number: u64,
}

/// One journaled mutation of the book. `seq` is assigned by the journal and
/// increases for the lifetime of the engine; it keys the log but is not a
/// tape column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub time: String,
    pub date: String,
    pub price: Decimal,
    pub order_number: u64,
    pub action: Activity,
    pub side: Side,
    pub is_market: bool,
    pub volume_original: u64,
    pub volume_disclosed: u64,
    pub top: TopOfBook,
    pub trade: Option<TradeFill>,
}

/// Append-only trade and event logs with monotone sequence counters.
#[derive(Debug)]
pub struct Journal {
    trades: Vec<Trade>,
    events: Vec<Event>,
    trade_seq: u64,
    event_seq: u64,
}

impl Journal {
    pub fn new() -> Self {
        Journal {
            trades: Vec::new(),
            events: Vec::new(),
            trade_seq: 1,
            event_seq: 1,
        }
    }

    /// Appends a trade built from a fill, stamping the next trade sequence
    /// number. Date and time come from the incoming order that caused it.
    pub fn record_trade(&mut self, date: &str, time: &str, fill: &TradeFill) {
        let trade = Trade {
            seq: self.trade_seq,
            date: date.to_string(),
            time: time.to_string(),
            price: fill.price,
            quantity: fill.quantity,
            buy_order_number: fill.buy_order_number,
            sell_order_number: fill.sell_order_number,
        };
        self.trade_seq += 1;
        self.trades.push(trade);
    }

    /// Appends an event, stamping the next event sequence number.
    pub fn record_event(&mut self, mut event: Event) {
        event.seq = self.event_seq;
        self.event_seq += 1;
        self.events.push(event);
    }

    /// Day boundary: the trade counter restarts, the event counter and the
    /// accumulated records do not.
    pub fn reset_trade_seq(&mut self) {
        self.trade_seq = 1;
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Writes the trade tape:
    /// `trade_seq, trade_date, trade_time, trade_price, trade_quantity,
    /// buy_order_number, sell_order_number` with the price at two decimals.
    pub fn write_trades<W: io::Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        for trade in &self.trades {
            w.write_record([
                trade.seq.to_string(),
                trade.date.clone(),
                trade.time.clone(),
                format!("{:.2}", trade.price),
                trade.quantity.to_string(),
                trade.buy_order_number.to_string(),
                trade.sell_order_number.to_string(),
            ])
            .context("writing trade tape row")?;
        }
        w.flush().context("flushing trade tape")?;
        Ok(())
    }

    /// Writes the event tape. Rows are variable length: the four trade
    /// columns are appended only when the event carries a fill, and absent
    /// best prices serialize as empty fields.
    pub fn write_events<W: io::Write>(&self, writer: W) -> anyhow::Result<()> {
        // Rows with a fill are four columns longer, so the writer must not
        // enforce a uniform record length.
        let mut w = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for event in &self.events {
            let mut row = vec![
                event.time.clone(),
                event.date.clone(),
                event.price.to_string(),
                event.order_number.to_string(),
                event.action.to_string(),
                event.side.to_string(),
                (if event.is_market { "Y" } else { "N" }).to_string(),
                event.volume_original.to_string(),
                event.volume_disclosed.to_string(),
                opt_price(event.top.best_bid),
                event.top.best_bid_volume_original.to_string(),
                opt_price(event.top.best_ask),
                event.top.best_ask_volume_original.to_string(),
            ];
            if let Some(fill) = &event.trade {
                row.push(fill.price.to_string());
                row.push(fill.quantity.to_string());
                row.push(fill.buy_order_number.to_string());
                row.push(fill.sell_order_number.to_string());
            }
            w.write_record(&row).context("writing event tape row")?;
        }
        w.flush().context("flushing event tape")?;
        Ok(())
    }
}

impl Default for Journal {
    fn default() -> Self {
        Journal::new()
    }
}

fn opt_price(price: Option<Decimal>) -> String {
    price.map(|p| p.to_string()).unwrap_or_default()
}
