//! Price update orchestrator.
//!
//! One cycle: collect active symbols, fan out quote fetches concurrently,
//! land every usable price on the matching active records, then run the
//! auto-close sweep exactly once. The sweep never starts before all fetches
//! settle. Cycles are mutually exclusive through a try-lock admission gate:
//! a trigger that arrives while a cycle is running is skipped, not queued.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::error::BacktestError;
use crate::services::auto_close::{AutoClosePolicy, run_auto_close_sweep};
use crate::services::market_data::MarketDataService;
use crate::services::records::{get_active_records, get_active_symbols, update_price};

/// Ceiling on one symbol's quote fetch; slower fetches count as failed.
const QUOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Default, Serialize)]
pub struct CycleReport {
    /// True when the gate was held by a still-running cycle.
    pub skipped: bool,
    pub symbols_requested: usize,
    pub symbols_updated: usize,
    pub records_updated: usize,
    pub records_closed: usize,
}

pub async fn run_price_update_cycle(
    db: &DatabaseConnection,
    market_data: &MarketDataService,
    policy: &AutoClosePolicy,
    gate: &tokio::sync::Mutex<()>,
) -> Result<CycleReport, BacktestError> {
    let Ok(_cycle) = gate.try_lock() else {
        tracing::warn!("price update cycle already running, skipping this trigger");
        return Ok(CycleReport {
            skipped: true,
            ..Default::default()
        });
    };

    let symbols = get_active_symbols(db).await?;
    if symbols.is_empty() {
        tracing::info!("no active records, skipping price update");
        return Ok(CycleReport::default());
    }

    tracing::info!("price update cycle: fetching quotes for {} symbols", symbols.len());

    let quotes = fetch_quotes(market_data, &symbols).await;
    let records_updated = apply_price_updates(db, &quotes).await?;
    // All price writes have landed; the sweep reads settled valuations.
    let closed = run_auto_close_sweep(db, policy).await?;

    let report = CycleReport {
        skipped: false,
        symbols_requested: symbols.len(),
        symbols_updated: quotes.len(),
        records_updated,
        records_closed: closed.len(),
    };

    tracing::info!(
        "price update cycle done: {}/{} symbols quoted, {} records updated, {} auto-closed",
        report.symbols_updated,
        report.symbols_requested,
        report.records_updated,
        report.records_closed
    );

    Ok(report)
}

/// Fan out quote fetches for distinct symbols and collect the usable ones.
/// A failed, timed-out, or non-positive quote drops its symbol from the map
/// without affecting the others.
async fn fetch_quotes(
    market_data: &MarketDataService,
    symbols: &[String],
) -> HashMap<String, Decimal> {
    let fetches = symbols.iter().map(|symbol| async move {
        match tokio::time::timeout(QUOTE_FETCH_TIMEOUT, market_data.get_quote(symbol)).await {
            Ok(Ok(quote)) if quote.price > 0.0 => {
                Decimal::from_f64_retain(quote.price).map(|price| (symbol.clone(), price))
            }
            Ok(Ok(quote)) => {
                tracing::warn!("{}: non-positive price {}, skipping this cycle", symbol, quote.price);
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("{}: quote fetch failed, skipping this cycle: {}", symbol, e);
                None
            }
            Err(_) => {
                tracing::warn!("{}: quote fetch timed out, skipping this cycle", symbol);
                None
            }
        }
    });

    join_all(fetches).await.into_iter().flatten().collect()
}

/// Land fetched prices on every active record whose symbol got a quote.
/// Visible for tests and callers that source prices elsewhere.
pub async fn apply_price_updates(
    db: &DatabaseConnection,
    quotes: &HashMap<String, Decimal>,
) -> Result<usize, BacktestError> {
    if quotes.is_empty() {
        tracing::warn!("no usable quotes this cycle");
        return Ok(0);
    }

    let active = get_active_records(db).await?;
    let now = Local::now().naive_local();
    let mut updated = 0;

    for record in &active {
        let Some(price) = quotes.get(&record.symbol) else {
            continue;
        };
        match update_price(db, record, *price, now).await {
            Ok(true) => updated += 1,
            Ok(false) => {} // closed underneath us, nothing to update
            Err(e) => tracing::error!("failed to update price for record {}: {}", record.id, e),
        }
    }

    tracing::info!("updated prices on {}/{} active records", updated, active.len());
    Ok(updated)
}
