//! SeaORM Entity for recommendation records
//!
//! One row per tracked trading idea. Rows are never deleted; the closed
//! history is the backtest dataset.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recommendation_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Instrument identifier (e.g. "600519")
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Strategy that produced it: shortterm / trend / value
    pub category: String,
    /// Free-form action label (e.g. "buy", "hold")
    pub recommendation: String,
    /// Confidence score 0-100
    pub ai_score: i32,
    /// Signal summary, may be empty
    pub signal: String,
    /// Free-text rationale
    pub reason: Option<String>,
    /// Price at creation time, always > 0
    pub entry_price: Decimal,
    pub entry_date: DateTime,
    /// Calendar day of entry_date; backs the unique per-day dedup index
    pub entry_day: Date,
    /// Latest known price; NULL until the first update cycle lands
    pub current_price: Option<Decimal>,
    pub price_updated_at: Option<DateTime>,
    /// Lifecycle state: active / closed (closed is terminal)
    pub status: String,
    /// Close fields are set exactly once, when status flips to closed
    pub close_price: Option<Decimal>,
    pub close_date: Option<DateTime>,
    /// profit / loss / expired / manual
    pub close_reason: Option<String>,
    /// Derived, recomputed on every price/close write
    pub profit_percent: Decimal,
    /// Derived, whole days between entry and close (or now while active)
    pub holding_days: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
