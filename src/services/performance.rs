//! Summary statistics and the date-bucketed return curve.
//!
//! Both read the materialized derived fields straight off the record store;
//! nothing here recomputes a valuation.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder};

use crate::entities::{prelude::*, recommendation_records};
use crate::error::BacktestError;
use crate::models::backtest::{PerformanceResponse, SummaryResponse};
use crate::services::records::{STATUS_ACTIVE, period_start};

/// Aggregate statistics over every record (any status) entered in `period`.
///
/// `total_return` is the per-record average multiplied back by the record
/// count: an additive proxy, not a compounded return.
pub async fn summary(
    db: &DatabaseConnection,
    period: &str,
    now: NaiveDateTime,
) -> Result<SummaryResponse, BacktestError> {
    let mut query = RecommendationRecords::find();
    if let Some(start) = period_start(period, now) {
        query = query.filter(recommendation_records::Column::EntryDate.gte(start));
    }

    let records = query.all(db).await?;
    if records.is_empty() {
        return Ok(SummaryResponse::empty(period));
    }

    let total_count = records.len() as u64;
    let active_count = records
        .iter()
        .filter(|r| r.status == STATUS_ACTIVE)
        .count() as u64;
    let closed_count = total_count - active_count;

    let profits: Vec<Decimal> = records.iter().map(|r| r.profit_percent).collect();
    let win_count = profits.iter().filter(|p| **p > Decimal::ZERO).count() as u64;

    let count = Decimal::from(total_count);
    let total: Decimal = profits.iter().copied().sum();
    let avg_return = total / count;
    let win_rate = Decimal::from(win_count) * Decimal::ONE_HUNDRED / count;

    let holding_total: i64 = records.iter().map(|r| r.holding_days as i64).sum();
    let avg_holding_days = Decimal::from(holding_total) / count;

    let best_profit = profits.iter().copied().max().unwrap_or(Decimal::ZERO);
    let worst_loss = profits.iter().copied().min().unwrap_or(Decimal::ZERO);

    Ok(SummaryResponse {
        total_return: to_rounded_f64(avg_return * count, 2),
        avg_return: to_rounded_f64(avg_return, 2),
        win_rate: to_rounded_f64(win_rate, 1),
        total_recommendations: total_count,
        active_count,
        closed_count,
        avg_holding_days: to_rounded_f64(avg_holding_days, 1),
        best_profit: to_rounded_f64(best_profit, 2),
        worst_loss: to_rounded_f64(worst_loss, 2),
        period: period.to_string(),
    })
}

/// Return curve bucketed by entry calendar date, ascending.
///
/// Each bucket's daily return is the arithmetic mean of profit percentages
/// among records entered that day; the cumulative series is a running sum.
/// Days without recommendations are skipped, not zero-filled.
pub async fn performance_curve(
    db: &DatabaseConnection,
    period: &str,
    now: NaiveDateTime,
) -> Result<PerformanceResponse, BacktestError> {
    // Unlike the listing/summary filters, the curve caps "all" at one year.
    let days = match period {
        "all" => 365,
        "7d" => 7,
        "90d" => 90,
        _ => 30,
    };
    let start = now - Duration::days(days);

    let records = RecommendationRecords::find()
        .filter(recommendation_records::Column::EntryDate.gte(start))
        .order_by(recommendation_records::Column::EntryDate, Order::Asc)
        .all(db)
        .await?;

    let mut buckets: BTreeMap<NaiveDate, (Decimal, u64)> = BTreeMap::new();
    for record in &records {
        let bucket = buckets
            .entry(record.entry_date.date())
            .or_insert((Decimal::ZERO, 0));
        bucket.0 += record.profit_percent;
        bucket.1 += 1;
    }

    let mut dates = Vec::with_capacity(buckets.len());
    let mut daily_returns = Vec::with_capacity(buckets.len());
    let mut cumulative_returns = Vec::with_capacity(buckets.len());
    let mut daily_count = Vec::with_capacity(buckets.len());
    let mut cumulative = Decimal::ZERO;

    for (date, (total, count)) in buckets {
        let avg = total / Decimal::from(count);
        cumulative += avg;

        dates.push(date.format("%Y-%m-%d").to_string());
        daily_returns.push(to_rounded_f64(avg, 2));
        cumulative_returns.push(to_rounded_f64(cumulative, 2));
        daily_count.push(count);
    }

    Ok(PerformanceResponse {
        dates,
        daily_returns,
        cumulative_returns,
        daily_count,
        period: period.to_string(),
    })
}

fn to_rounded_f64(value: Decimal, dp: u32) -> f64 {
    value.round_dp(dp).to_f64().unwrap_or(0.0)
}
