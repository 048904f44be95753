//! Record store for recommendation records.
//!
//! All mutation paths (`create_recommendation`, `update_price`,
//! `close_record`) go through here. Each write is a single atomic statement
//! that persists raw and derived fields together; `close_record` and
//! `update_price` additionally guard on `status = active` so a record that
//! was closed underneath them is left untouched.

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{prelude::*, recommendation_records};
use crate::error::BacktestError;
use crate::models::backtest::Category;
use crate::models::recommendations::CandidateStock;
use crate::services::valuation::reprice;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_CLOSED: &str = "closed";

pub const REASON_PROFIT: &str = "profit";
pub const REASON_LOSS: &str = "loss";
pub const REASON_EXPIRED: &str = "expired";
pub const REASON_MANUAL: &str = "manual";

#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub symbol: String,
    pub name: String,
    pub category: Category,
    pub recommendation: String,
    pub entry_price: Decimal,
    pub ai_score: i32,
    pub signal: String,
    pub reason: String,
}

/// Outcome of a close attempt. `AlreadyClosed` is a non-fatal result: the
/// record was terminal before we got to it (or a concurrent close won).
#[derive(Debug)]
pub enum CloseOutcome {
    Closed(recommendation_records::Model),
    AlreadyClosed,
}

/// Create one recommendation record.
///
/// Idempotent by calendar day: a second recommendation for the same
/// (symbol, category) on the same day returns the existing record unchanged.
pub async fn create_recommendation(
    db: &DatabaseConnection,
    new: NewRecommendation,
    now: NaiveDateTime,
) -> Result<recommendation_records::Model, BacktestError> {
    if new.entry_price <= Decimal::ZERO {
        return Err(BacktestError::InvalidInput(format!(
            "entry price must be positive, got {}",
            new.entry_price
        )));
    }

    let day = now.date();

    if let Some(record) = find_same_day(db, &new.symbol, new.category, day).await? {
        tracing::info!(
            "recommendation for {} ({}) already recorded today, keeping record {}",
            record.symbol,
            record.category,
            record.id
        );
        return Ok(record);
    }

    let model = recommendation_records::ActiveModel {
        symbol: Set(new.symbol.clone()),
        name: Set(new.name),
        category: Set(new.category.as_str().to_string()),
        recommendation: Set(new.recommendation),
        ai_score: Set(new.ai_score),
        signal: Set(new.signal),
        reason: Set(Some(new.reason)),
        entry_price: Set(new.entry_price),
        entry_date: Set(now),
        entry_day: Set(day),
        current_price: Set(None),
        price_updated_at: Set(None),
        status: Set(STATUS_ACTIVE.to_string()),
        close_price: Set(None),
        close_date: Set(None),
        close_reason: Set(None),
        profit_percent: Set(Decimal::ZERO),
        holding_days: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let record = match model.insert(db).await {
        Ok(record) => record,
        Err(e) => {
            // The unique (symbol, category, entry_day) index rejects the
            // insert when a concurrent create landed between our probe and
            // this write; resolve to that row.
            if let Some(record) = find_same_day(db, &new.symbol, new.category, day).await? {
                tracing::info!(
                    "recommendation for {} ({}) was recorded concurrently, keeping record {}",
                    record.symbol,
                    record.category,
                    record.id
                );
                return Ok(record);
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        "created recommendation {}: {} {} ({}) @ {}",
        record.id,
        record.symbol,
        record.name,
        record.category,
        record.entry_price
    );

    Ok(record)
}

async fn find_same_day(
    db: &DatabaseConnection,
    symbol: &str,
    category: Category,
    day: chrono::NaiveDate,
) -> Result<Option<recommendation_records::Model>, BacktestError> {
    let record = RecommendationRecords::find()
        .filter(recommendation_records::Column::Symbol.eq(symbol))
        .filter(recommendation_records::Column::Category.eq(category.as_str()))
        .filter(recommendation_records::Column::EntryDay.eq(day))
        .one(db)
        .await?;

    Ok(record)
}

/// Create records for a batch of generator candidates. One bad item does not
/// abort the batch; returns how many items resolved to a record (newly
/// created or deduplicated).
pub async fn batch_create(
    db: &DatabaseConnection,
    stocks: &[CandidateStock],
    category: Category,
    now: NaiveDateTime,
) -> usize {
    let mut count = 0;

    for stock in stocks {
        let Some(entry_price) = Decimal::from_f64_retain(stock.price) else {
            tracing::warn!(
                "skipping candidate {}: unrepresentable price {}",
                stock.symbol,
                stock.price
            );
            continue;
        };

        let new = NewRecommendation {
            symbol: stock.symbol.clone(),
            name: stock.name.clone(),
            category,
            recommendation: stock
                .recommendation
                .clone()
                .unwrap_or_else(|| "hold".to_string()),
            entry_price,
            ai_score: stock.ai_score.unwrap_or(50),
            signal: stock.signal.clone().unwrap_or_default(),
            reason: stock.reason.clone().unwrap_or_default(),
        };

        match create_recommendation(db, new, now).await {
            Ok(_) => count += 1,
            Err(e) => {
                tracing::error!("failed to record recommendation for {}: {}", stock.symbol, e)
            }
        }
    }

    tracing::info!(
        "recorded {}/{} {} recommendations",
        count,
        stocks.len(),
        category.as_str()
    );

    count
}

/// Start of the filter window for a period string, `None` for unrestricted.
/// Unknown period strings fall back to 30 days.
pub fn period_start(period: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let days = match period {
        "all" => return None,
        "7d" => 7,
        "90d" => 90,
        _ => 30,
    };
    Some(now - Duration::days(days))
}

/// Paginated, filtered record listing ordered by entry date descending.
/// Pages are 1-indexed. Returns the page plus the total match count.
pub async fn get_records(
    db: &DatabaseConnection,
    period: &str,
    status: Option<&str>,
    category: Option<&str>,
    page: u64,
    page_size: u64,
    now: NaiveDateTime,
) -> Result<(Vec<recommendation_records::Model>, u64), BacktestError> {
    let mut query = RecommendationRecords::find();

    if let Some(start) = period_start(period, now) {
        query = query.filter(recommendation_records::Column::EntryDate.gte(start));
    }
    if let Some(status) = status {
        query = query.filter(recommendation_records::Column::Status.eq(status));
    }
    if let Some(category) = category {
        query = query.filter(recommendation_records::Column::Category.eq(category));
    }

    let total = query.clone().count(db).await?;

    let page = page.max(1);
    let records = query
        .order_by(recommendation_records::Column::EntryDate, Order::Desc)
        .offset((page - 1) * page_size)
        .limit(page_size)
        .all(db)
        .await?;

    Ok((records, total))
}

/// Distinct symbols across all active records.
pub async fn get_active_symbols(db: &DatabaseConnection) -> Result<Vec<String>, BacktestError> {
    let symbols = RecommendationRecords::find()
        .select_only()
        .column(recommendation_records::Column::Symbol)
        .filter(recommendation_records::Column::Status.eq(STATUS_ACTIVE))
        .distinct()
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(symbols)
}

pub async fn get_active_records(
    db: &DatabaseConnection,
) -> Result<Vec<recommendation_records::Model>, BacktestError> {
    let records = RecommendationRecords::find()
        .filter(recommendation_records::Column::Status.eq(STATUS_ACTIVE))
        .all(db)
        .await?;

    Ok(records)
}

pub async fn find_record(
    db: &DatabaseConnection,
    id: i32,
) -> Result<recommendation_records::Model, BacktestError> {
    RecommendationRecords::find_by_id(id)
        .one(db)
        .await?
        .ok_or(BacktestError::NotFound(id))
}

/// Set the latest known price on an active record and recompute the derived
/// fields in the same statement. Returns false (silent no-op) if the record
/// is closed, including when it was closed concurrently.
pub async fn update_price(
    db: &DatabaseConnection,
    record: &recommendation_records::Model,
    new_price: Decimal,
    now: NaiveDateTime,
) -> Result<bool, BacktestError> {
    let valuation = reprice(record.entry_price, record.entry_date, Some(new_price), now);

    let update = recommendation_records::ActiveModel {
        current_price: Set(Some(new_price)),
        price_updated_at: Set(Some(now)),
        profit_percent: Set(valuation.profit_percent),
        holding_days: Set(valuation.holding_days),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = RecommendationRecords::update_many()
        .set(update)
        .filter(recommendation_records::Column::Id.eq(record.id))
        .filter(recommendation_records::Column::Status.eq(STATUS_ACTIVE))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Transition a record to its terminal closed state.
///
/// The write is a compare-and-set on `status = active`, so concurrent close
/// attempts on the same record serialize: exactly one wins, the loser gets
/// `AlreadyClosed`. If `close_price` is not supplied the last known price is
/// used, falling back to the entry price when no quote ever landed.
pub async fn close_record(
    db: &DatabaseConnection,
    id: i32,
    close_price: Option<Decimal>,
    reason: &str,
    now: NaiveDateTime,
) -> Result<CloseOutcome, BacktestError> {
    let record = find_record(db, id).await?;

    if record.status == STATUS_CLOSED {
        return Ok(CloseOutcome::AlreadyClosed);
    }

    let close_price = close_price
        .or(record.current_price)
        .unwrap_or(record.entry_price);

    let valuation = reprice(record.entry_price, record.entry_date, Some(close_price), now);

    let update = recommendation_records::ActiveModel {
        status: Set(STATUS_CLOSED.to_string()),
        close_price: Set(Some(close_price)),
        close_date: Set(Some(now)),
        close_reason: Set(Some(reason.to_string())),
        current_price: Set(Some(close_price)),
        profit_percent: Set(valuation.profit_percent),
        holding_days: Set(valuation.holding_days),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = RecommendationRecords::update_many()
        .set(update)
        .filter(recommendation_records::Column::Id.eq(id))
        .filter(recommendation_records::Column::Status.eq(STATUS_ACTIVE))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Lost the race: someone closed this record between our read and write.
        tracing::warn!("record {} was closed concurrently, skipping", id);
        return Ok(CloseOutcome::AlreadyClosed);
    }

    let closed = find_record(db, id).await?;

    tracing::info!(
        "closed record {}: {} @ {} ({}), profit {}%",
        closed.id,
        closed.symbol,
        close_price,
        reason,
        closed.profit_percent
    );

    Ok(CloseOutcome::Closed(closed))
}
