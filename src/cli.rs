use crate::driver;
use crate::matching::EngineConfig;
use crate::router::OrderRouter;
use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

/// Replay an exchange order feed through a single-symbol limit order book.
#[derive(Parser)]
#[command(name = "lob-engine")]
#[command(version, about = "Replay an exchange order feed through a limit order book")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an order-feed CSV and write the trade and event tapes
    Replay {
        /// Headerless order-feed CSV in the NSE column layout
        input: PathBuf,

        /// Trade tape output path
        #[arg(long, default_value = "trades.csv")]
        trades: PathBuf,

        /// Event tape output path
        #[arg(long, default_value = "events.csv")]
        events: PathBuf,

        /// Minimum price increment; off-grid limit prices are logged, not
        /// rejected
        #[arg(long, default_value = "0.05")]
        tick_size: Decimal,

        /// Report partial fills with the incoming quantity instead of the
        /// historical resting-minus-incoming arithmetic
        #[arg(long)]
        corrected_fill_qty: bool,

        /// Post the unfilled remainder of a marketable limit order instead
        /// of discarding it when the opposite side runs dry
        #[arg(long)]
        post_limit_residual: bool,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            input,
            trades,
            events,
            tick_size,
            corrected_fill_qty,
            post_limit_residual,
        } => {
            let config = EngineConfig {
                tick_size,
                corrected_fill_qty,
                post_limit_residual,
            };
            let mut router = OrderRouter::new(config);

            let feed = File::open(&input)
                .with_context(|| format!("opening order feed {}", input.display()))?;
            let processed = driver::replay(feed, &mut router)
                .with_context(|| format!("replaying {}", input.display()))?;

            let book = router.into_book();
            let trade_out = File::create(&trades)
                .with_context(|| format!("creating {}", trades.display()))?;
            book.journal.write_trades(trade_out)?;
            let event_out = File::create(&events)
                .with_context(|| format!("creating {}", events.display()))?;
            book.journal.write_events(event_out)?;

            info!(
                processed,
                trades = book.journal.trades().len(),
                events = book.journal.events().len(),
                "replay complete"
            );
            Ok(())
        }
    }
}
