use crate::book::Book;
use crate::errors::EngineError;
use crate::journal::Event;
use crate::matching::{self, EngineConfig};
use crate::orders::{Activity, Order, Side};
use chrono::Datelike;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Routes each incoming action to the matcher or the book-mutation
/// primitives. Owns the book for the lifetime of the replay; one call to
/// [`OrderRouter::process`] fully absorbs one action, fills and all, before
/// the next is accepted.
#[derive(Debug)]
pub struct OrderRouter {
    book: Book,
    config: EngineConfig,
}

impl OrderRouter {
    pub fn new(config: EngineConfig) -> Self {
        OrderRouter {
            book: Book::new(),
            config,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_book(self) -> Book {
        self.book
    }

    /// Single entry point for the order stream.
    ///
    /// The first action pins the session's day-of-month; any later action on
    /// a different day flushes the book (outstanding orders expire at end of
    /// day) before being handled. Market orders mislabeled as modifies are
    /// reinterpreted as adds.
    pub fn process(&mut self, activity: Activity, order: Order) -> Result<(), EngineError> {
        info!(order = order.order_number, ?activity, "processing order");

        let day = day_of_month(&order)?;
        match self.book.current_day {
            None => {
                info!(day, "setting session day");
                self.book.current_day = Some(day);
            }
            Some(current) if current != day => {
                info!(day, "new day - book reset");
                self.book.clear_book();
                self.book.current_day = Some(day);
            }
            Some(_) => {}
        }

        match activity {
            Activity::Add => self.add(order),
            Activity::Cancel => self.cancel(order),
            Activity::Modify if order.is_market => self.add(order),
            Activity::Modify => self.modify(order),
        }
    }

    /// Event skeleton for an action, carrying the pre-action top-of-book.
    /// Built before the book is touched; every event the action emits clones
    /// this.
    fn entry_event(&self, activity: Activity, order: &Order) -> Result<Event, EngineError> {
        Ok(Event {
            seq: 0,
            time: order.trans_time.clone(),
            date: order.trans_date.clone(),
            price: order.limit_price,
            order_number: order.order_number,
            action: activity,
            side: order.side,
            is_market: order.is_market,
            volume_original: order.volume_original,
            volume_disclosed: order.volume_disclosed,
            top: self.book.top_of_book()?,
            trade: None,
        })
    }

    fn add(&mut self, order: Order) -> Result<(), EngineError> {
        let template = self.entry_event(Activity::Add, &order)?;
        info!(
            order = order.order_number,
            side = %order.side,
            price = %order.limit_price,
            volume = order.volume_original,
            "attempting add"
        );

        if order.is_market || matching::is_marketable(&self.book, &order)? {
            let mut incoming = order;
            matching::sweep(&mut self.book, &mut incoming, &template, &self.config)
        } else {
            self.book
                .half_mut(order.side)
                .ensure_level(order.limit_price)
                .append(order);
            self.book.journal.record_event(template);
            Ok(())
        }
    }

    fn modify(&mut self, new_order: Order) -> Result<(), EngineError> {
        if new_order.is_market {
            return Err(EngineError::IllegalMarketOrderAction {
                order_number: new_order.order_number,
                action: "modify",
            });
        }
        let template = self.entry_event(Activity::Modify, &new_order)?;
        info!(
            order = new_order.order_number,
            side = %new_order.side,
            "attempting modify"
        );

        let side = new_order.side;
        let located = self.book.half(side).find_order(new_order.order_number).and_then(|p| {
            self.book
                .half(side)
                .level(p)
                .and_then(|level| level.get(new_order.order_number))
                .map(|old| (p, old.volume_original, old.volume_disclosed))
        });

        match located {
            None => {
                warn!(
                    order = new_order.order_number,
                    "order not found; modify journaled without effect"
                );
            }
            // A price change re-queues the order at the back; a volume
            // decrease edits it in place; a volume increase adds the delta
            // as a fresh order behind the queue.
            Some((old_price, _, _)) if new_order.limit_price != old_price => {
                info!(
                    order = new_order.order_number,
                    old = %old_price,
                    new = %new_order.limit_price,
                    "modify changes price; re-queuing"
                );
                self.remove_resting(side, old_price, new_order.order_number);
                self.add(new_order.clone())?;
            }
            Some((old_price, old_original, _)) if new_order.volume_original < old_original => {
                info!(
                    order = new_order.order_number,
                    old = old_original,
                    new = new_order.volume_original,
                    "modify reduces original volume in place"
                );
                if let Some(level) = self.book.half_mut(side).level_mut(old_price) {
                    level.replace(new_order.order_number, new_order.clone());
                }
            }
            Some((old_price, _, old_disclosed)) if new_order.volume_disclosed < old_disclosed => {
                info!(
                    order = new_order.order_number,
                    old = old_disclosed,
                    new = new_order.volume_disclosed,
                    "modify reduces disclosed volume in place"
                );
                if let Some(level) = self.book.half_mut(side).level_mut(old_price) {
                    level.replace(new_order.order_number, new_order.clone());
                }
            }
            Some((_, old_original, _)) if new_order.volume_original > old_original => {
                info!(
                    order = new_order.order_number,
                    old = old_original,
                    new = new_order.volume_original,
                    "modify raises original volume; adding delta"
                );
                let mut delta = new_order.clone();
                delta.volume_original = new_order.volume_original - old_original;
                self.add(delta)?;
            }
            Some((_, _, old_disclosed)) if new_order.volume_disclosed > old_disclosed => {
                info!(
                    order = new_order.order_number,
                    old = old_disclosed,
                    new = new_order.volume_disclosed,
                    "modify raises disclosed volume; adding delta"
                );
                let mut delta = new_order.clone();
                delta.volume_disclosed = new_order.volume_disclosed - old_disclosed;
                self.add(delta)?;
            }
            Some(_) => {
                info!(order = new_order.order_number, "modify changes nothing");
            }
        }

        self.book.journal.record_event(template);
        Ok(())
    }

    fn cancel(&mut self, order: Order) -> Result<(), EngineError> {
        if order.is_market {
            return Err(EngineError::IllegalMarketOrderAction {
                order_number: order.order_number,
                action: "cancel",
            });
        }
        let template = self.entry_event(Activity::Cancel, &order)?;
        info!(order = order.order_number, "attempting cancel");

        if self.remove_resting(order.side, order.limit_price, order.order_number) {
            info!(
                order = order.order_number,
                side = %order.side,
                price = %order.limit_price,
                "canceled order"
            );
        } else {
            warn!(
                order = order.order_number,
                "order not found; cancel journaled without effect"
            );
        }

        self.book.journal.record_event(template);
        Ok(())
    }

    /// Removes a resting order, pruning the level when it empties. Returns
    /// whether anything was removed.
    fn remove_resting(&mut self, side: Side, price: Decimal, order_number: u64) -> bool {
        let half = self.book.half_mut(side);
        let Some(level) = half.level_mut(price) else {
            return false;
        };
        let removed = level.remove(order_number).is_some();
        let emptied = level.is_empty();
        if removed && emptied {
            half.drop_level(price);
        }
        removed
    }
}

fn day_of_month(order: &Order) -> Result<u32, EngineError> {
    NaiveDate::parse_from_str(order.trans_date.trim(), "%m/%d/%Y")
        .map(|date| date.day())
        .map_err(|_| EngineError::InvalidDate {
            order_number: order.order_number,
            date: order.trans_date.clone(),
        })
}
