//! Pure valuation of a record: profit percentage and holding days.
//!
//! Every write that touches `current_price` or the close fields recomputes
//! both derived values through here and persists them in the same statement,
//! so readers never see prices and derived fields out of sync.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub profit_percent: Decimal,
    pub holding_days: i32,
}

/// Reprice against a reference point.
///
/// `reference_price` is the close price for closed records, the latest known
/// price for active ones; `None` (no price seen yet) values at the entry
/// price, i.e. zero profit. `reference_date` is the close date for closed
/// records and "now" for active ones.
pub fn reprice(
    entry_price: Decimal,
    entry_date: NaiveDateTime,
    reference_price: Option<Decimal>,
    reference_date: NaiveDateTime,
) -> Valuation {
    let reference_price = reference_price.unwrap_or(entry_price);

    let profit_percent = if entry_price > Decimal::ZERO {
        ((reference_price - entry_price) / entry_price * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let holding_days = (reference_date - entry_date).num_days().max(0) as i32;

    Valuation {
        profit_percent,
        holding_days,
    }
}
