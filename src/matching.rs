use crate::book::Book;
use crate::errors::EngineError;
use crate::journal::{Event, TradeFill};
use crate::orders::{Order, Side};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Engine knobs. The defaults reproduce the historical feed-replay behavior
/// exactly; the two booleans opt into the corrected variants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum price increment. Prices off the grid are reported, never
    /// rejected; the matcher itself treats prices opaquely.
    pub tick_size: Decimal,
    /// Report partial fills that leave the resting order alive with the
    /// incoming quantity instead of the historical `resting - incoming`.
    pub corrected_fill_qty: bool,
    /// Post the unfilled remainder of a marketable limit order instead of
    /// discarding it when the opposite side runs dry.
    pub post_limit_residual: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_size: Decimal::new(5, 2),
            corrected_fill_qty: false,
            post_limit_residual: false,
        }
    }
}

/// Marketability of an incoming limit order: a buy crosses when it prices at
/// or above the best ask, a sell when it prices at or below the best bid.
pub(crate) fn is_marketable(book: &Book, order: &Order) -> Result<bool, EngineError> {
    Ok(match order.side {
        Side::Buy => {
            matches!(book.best_ask_price()?, Some(ask) if order.limit_price >= ask)
        }
        Side::Sell => {
            matches!(book.best_bid_price()?, Some(bid) if order.limit_price <= bid)
        }
    })
}

/// Sweeps the side opposite `incoming` under price-time priority: best price
/// first, oldest order first within a level, one fill per iteration with the
/// best price re-queried after every removal. Each fill journals one trade
/// and one event cloned from `template` with the fill payload attached.
///
/// The sweep never re-tests marketability; once invoked it consumes
/// successive best levels until the incoming residual reaches zero or the
/// opposite side empties. Any residual left at that point is discarded
/// (market orders always; limit orders unless `post_limit_residual`).
pub(crate) fn sweep(
    book: &mut Book,
    incoming: &mut Order,
    template: &Event,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    let opposite = incoming.side.opposite();

    while incoming.volume_original > 0 {
        let Some(best_price) = book.half(opposite).best_price()? else {
            settle_residual(book, incoming, config);
            break;
        };

        let (fill, level_emptied) = {
            let level = book.half_mut(opposite).level_mut(best_price).ok_or(
                EngineError::EmptyLevel {
                    side: opposite,
                    price: best_price,
                },
            )?;
            let resting = level.front_mut().ok_or(EngineError::EmptyLevel {
                side: opposite,
                price: best_price,
            })?;

            let resting_volume = resting.volume_original;
            let incoming_volume = incoming.volume_original;
            let (buy_order_number, sell_order_number) = match incoming.side {
                Side::Buy => (incoming.order_number, resting.order_number),
                Side::Sell => (resting.order_number, incoming.order_number),
            };

            let quantity = if resting_volume == incoming_volume {
                incoming.volume_original = 0;
                level.pop_front();
                incoming_volume
            } else if resting_volume > incoming_volume {
                resting.volume_original -= incoming_volume;
                incoming.volume_original = 0;
                if config.corrected_fill_qty {
                    incoming_volume
                } else {
                    // Historical arithmetic: the tape records the resting
                    // order's remainder, not the filled quantity.
                    resting_volume - incoming_volume
                }
            } else {
                incoming.volume_original -= resting_volume;
                level.pop_front();
                resting_volume
            };

            (
                TradeFill {
                    price: best_price,
                    quantity,
                    buy_order_number,
                    sell_order_number,
                },
                level.is_empty(),
            )
        };

        if level_emptied {
            book.half_mut(opposite).drop_level(best_price);
        }

        debug!(
            price = %fill.price,
            quantity = fill.quantity,
            buy = fill.buy_order_number,
            sell = fill.sell_order_number,
            "fill"
        );
        book.journal
            .record_trade(&incoming.trans_date, &incoming.trans_time, &fill);
        let mut event = template.clone();
        event.trade = Some(fill);
        book.journal.record_event(event);
    }

    Ok(())
}

fn settle_residual(book: &mut Book, incoming: &Order, config: &EngineConfig) {
    if incoming.is_market {
        info!(
            order = incoming.order_number,
            residual = incoming.volume_original,
            "no opposite liquidity; market order residual discarded"
        );
    } else if config.post_limit_residual {
        info!(
            order = incoming.order_number,
            residual = incoming.volume_original,
            price = %incoming.limit_price,
            "opposite side exhausted; posting limit order residual"
        );
        book.half_mut(incoming.side)
            .ensure_level(incoming.limit_price)
            .append(incoming.clone());
    } else {
        info!(
            order = incoming.order_number,
            residual = incoming.volume_original,
            "opposite side exhausted; limit order residual discarded"
        );
    }
}
