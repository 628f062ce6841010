use crate::errors::EngineError;
use crate::journal::{Journal, TopOfBook};
use crate::orders::{Order, Side};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::collections::btree_map::Entry;
use tracing::info;

/// FIFO queue of resting orders at one price on one side.
///
/// Appending places an order strictly after everything already resting, which
/// is what gives the book its time priority. The matcher only ever touches
/// the front; modify and cancel may remove or replace anywhere in the queue.
#[derive(Debug, Default)]
pub struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    fn new() -> Self {
        PriceLevel {
            orders: VecDeque::new(),
        }
    }

    pub fn append(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Removes the order with the given number from anywhere in the queue.
    pub fn remove(&mut self, order_number: u64) -> Option<Order> {
        let pos = self
            .orders
            .iter()
            .position(|o| o.order_number == order_number)?;
        self.orders.remove(pos)
    }

    /// Overwrites the order with the given number in place, keeping its
    /// queue position. Returns false if no such order rests here.
    pub fn replace(&mut self, order_number: u64, order: Order) -> bool {
        match self
            .orders
            .iter_mut()
            .find(|o| o.order_number == order_number)
        {
            Some(slot) => {
                *slot = order;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, order_number: u64) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_number == order_number)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of (original, disclosed) volumes resting at this level.
    pub fn volume(&self) -> (u64, u64) {
        self.orders.iter().fold((0, 0), |(orig, disc), o| {
            (orig + o.volume_original, disc + o.volume_disclosed)
        })
    }
}

/// One side of the book: price levels keyed by limit price. The best price
/// is the highest key for bids and the lowest for asks.
#[derive(Debug)]
pub struct HalfBook {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl HalfBook {
    pub fn new(side: Side) -> Self {
        HalfBook {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Best resting price, or `None` when the side is empty. Finding an
    /// empty level here means the level lifecycle was mismanaged and the
    /// stream cannot be trusted further.
    pub fn best_price(&self) -> Result<Option<Decimal>, EngineError> {
        let entry = match self.side {
            Side::Buy => self.levels.iter().next_back(),
            Side::Sell => self.levels.iter().next(),
        };
        match entry {
            None => Ok(None),
            Some((price, level)) if level.is_empty() => Err(EngineError::EmptyLevel {
                side: self.side,
                price: *price,
            }),
            Some((price, _)) => Ok(Some(*price)),
        }
    }

    pub fn level(&self, price: Decimal) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn level_mut(&mut self, price: Decimal) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Existing level at `price`, or a freshly created empty one.
    pub fn ensure_level(&mut self, price: Decimal) -> &mut PriceLevel {
        match self.levels.entry(price) {
            Entry::Vacant(entry) => {
                info!(side = %self.side, %price, "created new price level");
                entry.insert(PriceLevel::new())
            }
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    /// Must run whenever the last order leaves a level; empty levels are
    /// never allowed to linger in the map.
    pub fn drop_level(&mut self, price: Decimal) {
        if self.levels.remove(&price).is_some() {
            info!(side = %self.side, %price, "deleted price level");
        }
    }

    /// Sum of (original, disclosed) volumes at `price`, zero when absent.
    pub fn total_volume_at(&self, price: Decimal) -> (u64, u64) {
        self.levels
            .get(&price)
            .map(|level| level.volume())
            .unwrap_or((0, 0))
    }

    /// Price at which the order currently rests, scanning levels in price
    /// order. Modify needs this because the feed record only carries the
    /// order's new price.
    pub fn find_order(&self, order_number: u64) -> Option<Decimal> {
        self.levels
            .iter()
            .find(|(_, level)| level.get(order_number).is_some())
            .map(|(price, _)| *price)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> impl Iterator<Item = (&Decimal, &PriceLevel)> {
        self.levels.iter()
    }

    fn clear(&mut self) {
        self.levels.clear();
    }
}

/// The full book: both half-books, the day-of-month sentinel used for the
/// end-of-day flush, and the journal the matcher and router write into.
#[derive(Debug)]
pub struct Book {
    bids: HalfBook,
    asks: HalfBook,
    pub current_day: Option<u32>,
    pub journal: Journal,
}

impl Book {
    pub fn new() -> Self {
        Book {
            bids: HalfBook::new(Side::Buy),
            asks: HalfBook::new(Side::Sell),
            current_day: None,
            journal: Journal::new(),
        }
    }

    pub fn half(&self, side: Side) -> &HalfBook {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn half_mut(&mut self, side: Side) -> &mut HalfBook {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub fn best_bid_price(&self) -> Result<Option<Decimal>, EngineError> {
        self.bids.best_price()
    }

    pub fn best_ask_price(&self) -> Result<Option<Decimal>, EngineError> {
        self.asks.best_price()
    }

    /// Total (original, disclosed) volume at the best bid, (0, 0) when the
    /// bid side is empty.
    pub fn best_bid_quantity(&self) -> Result<(u64, u64), EngineError> {
        match self.best_bid_price()? {
            Some(price) => Ok(self.bids.total_volume_at(price)),
            None => Ok((0, 0)),
        }
    }

    pub fn best_ask_quantity(&self) -> Result<(u64, u64), EngineError> {
        match self.best_ask_price()? {
            Some(price) => Ok(self.asks.total_volume_at(price)),
            None => Ok((0, 0)),
        }
    }

    /// Snapshot of both tops, taken by the router before an action touches
    /// the book.
    pub fn top_of_book(&self) -> Result<TopOfBook, EngineError> {
        let best_bid = self.best_bid_price()?;
        let (best_bid_volume_original, _) = self.best_bid_quantity()?;
        let best_ask = self.best_ask_price()?;
        let (best_ask_volume_original, _) = self.best_ask_quantity()?;
        Ok(TopOfBook {
            best_bid,
            best_bid_volume_original,
            best_ask,
            best_ask_volume_original,
        })
    }

    /// End-of-day flush: both sides emptied, trade numbering restarted.
    /// Journaled trades and events survive.
    pub fn clear_book(&mut self) {
        info!("clearing outstanding limit orders");
        self.bids.clear();
        self.asks.clear();
        self.journal.reset_trade_seq();
    }

    /// Structural invariants, asserted after every processed action in the
    /// test suites.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        for half in [&self.bids, &self.asks] {
            for (price, level) in half.levels() {
                assert!(!level.is_empty(), "empty level at {price} on {}", half.side());
                for order in level.iter() {
                    assert_eq!(order.side, half.side());
                    assert_eq!(order.limit_price, *price);
                }
            }
        }
        if let (Ok(Some(bid)), Ok(Some(ask))) = (self.best_bid_price(), self.best_ask_price()) {
            assert!(bid < ask, "crossed book: {bid} >= {ask}");
        }
    }
}

impl Default for Book {
    fn default() -> Self {
        Book::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn price(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn order(number: u64, side: Side, limit: &str, volume: u64) -> Order {
        Order {
            order_number: number,
            side,
            limit_price: price(limit),
            volume_original: volume,
            volume_disclosed: volume,
            is_market: false,
            trans_date: "01/01/2020".into(),
            trans_time: "09:15:00".into(),
        }
    }

    #[test]
    fn level_preserves_fifo_and_volume_sums() {
        let mut level = PriceLevel::new();
        level.append(order(1, Side::Buy, "49.00", 30));
        level.append(order(2, Side::Buy, "49.00", 20));

        assert_eq!(level.front().unwrap().order_number, 1);
        assert_eq!(level.volume(), (50, 50));

        let popped = level.pop_front().unwrap();
        assert_eq!(popped.order_number, 1);
        assert_eq!(level.front().unwrap().order_number, 2);
    }

    #[test]
    fn level_removes_by_order_number_anywhere() {
        let mut level = PriceLevel::new();
        level.append(order(1, Side::Buy, "49.00", 10));
        level.append(order(2, Side::Buy, "49.00", 10));
        level.append(order(3, Side::Buy, "49.00", 10));

        assert_eq!(level.remove(2).unwrap().order_number, 2);
        assert!(level.remove(2).is_none());
        let numbers: Vec<u64> = level.iter().map(|o| o.order_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn level_replace_keeps_queue_position() {
        let mut level = PriceLevel::new();
        level.append(order(1, Side::Buy, "49.00", 100));
        level.append(order(2, Side::Buy, "49.00", 100));

        assert!(level.replace(1, order(1, Side::Buy, "49.00", 40)));
        assert_eq!(level.front().unwrap().order_number, 1);
        assert_eq!(level.front().unwrap().volume_original, 40);
        assert!(!level.replace(9, order(9, Side::Buy, "49.00", 1)));
    }

    #[test]
    fn best_price_is_max_for_bids_min_for_asks() {
        let mut bids = HalfBook::new(Side::Buy);
        bids.ensure_level(price("49.00"))
            .append(order(1, Side::Buy, "49.00", 10));
        bids.ensure_level(price("49.50"))
            .append(order(2, Side::Buy, "49.50", 10));
        assert_eq!(bids.best_price().unwrap(), Some(price("49.50")));

        let mut asks = HalfBook::new(Side::Sell);
        asks.ensure_level(price("50.00"))
            .append(order(3, Side::Sell, "50.00", 10));
        asks.ensure_level(price("50.50"))
            .append(order(4, Side::Sell, "50.50", 10));
        assert_eq!(asks.best_price().unwrap(), Some(price("50.00")));

        assert_eq!(HalfBook::new(Side::Buy).best_price().unwrap(), None);
    }

    #[test]
    fn lingering_empty_level_is_fatal() {
        let mut bids = HalfBook::new(Side::Buy);
        bids.ensure_level(price("49.00"));
        assert!(matches!(
            bids.best_price(),
            Err(EngineError::EmptyLevel { .. })
        ));
    }

    #[test]
    fn find_order_reports_resting_price() {
        let mut bids = HalfBook::new(Side::Buy);
        bids.ensure_level(price("48.00"))
            .append(order(1, Side::Buy, "48.00", 10));
        bids.ensure_level(price("49.00"))
            .append(order(2, Side::Buy, "49.00", 10));

        assert_eq!(bids.find_order(2), Some(price("49.00")));
        assert_eq!(bids.find_order(5), None);
    }

    #[test]
    fn clear_book_resets_trade_seq_but_keeps_journal() {
        let mut book = Book::new();
        book.half_mut(Side::Buy)
            .ensure_level(price("49.00"))
            .append(order(1, Side::Buy, "49.00", 10));
        book.journal.record_trade(
            "01/01/2020",
            "09:15:00",
            &crate::journal::TradeFill {
                price: price("49.00"),
                quantity: 10,
                buy_order_number: 1,
                sell_order_number: 2,
            },
        );

        book.clear_book();
        assert!(book.half(Side::Buy).is_empty());
        assert_eq!(book.journal.trades().len(), 1);
        book.journal.record_trade(
            "01/02/2020",
            "09:15:00",
            &crate::journal::TradeFill {
                price: price("49.00"),
                quantity: 5,
                buy_order_number: 3,
                sell_order_number: 4,
            },
        );
        assert_eq!(book.journal.trades()[1].seq, 1);
    }

    #[test]
    fn top_of_book_sums_original_volume_at_best() {
        let mut book = Book::new();
        book.half_mut(Side::Buy)
            .ensure_level(price("49.00"))
            .append(order(1, Side::Buy, "49.00", 60));
        book.half_mut(Side::Buy)
            .ensure_level(price("49.00"))
            .append(order(2, Side::Buy, "49.00", 40));
        book.half_mut(Side::Sell)
            .ensure_level(price("50.00"))
            .append(order(3, Side::Sell, "50.00", 25));

        let top = book.top_of_book().unwrap();
        assert_eq!(top.best_bid, Some(price("49.00")));
        assert_eq!(top.best_bid_volume_original, 100);
        assert_eq!(top.best_ask, Some(price("50.00")));
        assert_eq!(top.best_ask_volume_original, 25);
        book.assert_invariants();
    }
}
