use crate::orders::RawRecord;
use crate::router::OrderRouter;
use anyhow::Context;
use rust_decimal::Decimal;
use std::io;
use tracing::warn;

/// Replays a headerless order-feed CSV through the router, one row at a
/// time in stream order. Returns the number of actions absorbed. The first
/// malformed row or fatal engine error aborts the stream; everything
/// journaled before it is retained in the router's book.
pub fn replay<R: io::Read>(reader: R, router: &mut OrderRouter) -> anyhow::Result<u64> {
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let tick_size = router.config().tick_size;
    let mut processed = 0u64;
    for (index, row) in rows.deserialize::<RawRecord>().enumerate() {
        let raw: RawRecord = row.with_context(|| format!("malformed input row {}", index + 1))?;
        let (activity, order) = raw.into_action()?;
        if !order.is_market && off_tick(order.limit_price, tick_size) {
            // Reported for downstream validation; the book indexes the
            // price as given.
            warn!(
                order = order.order_number,
                price = %order.limit_price,
                tick = %tick_size,
                "limit price off the tick grid"
            );
        }
        router.process(activity, order)?;
        processed += 1;
    }
    Ok(processed)
}

fn off_tick(price: Decimal, tick: Decimal) -> bool {
    !tick.is_zero() && !(price % tick).is_zero()
}
