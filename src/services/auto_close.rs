//! Auto-close policy: stop-profit / stop-loss / max-holding-days.
//!
//! The policy owns the runtime-mutable thresholds. `evaluate` is stateless
//! and pure over a record snapshot; the sweep drives it across every active
//! record and funnels matches through the record store's close path.

use std::sync::Arc;

use chrono::Local;
use parking_lot::RwLock;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::entities::recommendation_records;
use crate::error::BacktestError;
use crate::models::backtest::StopConfigUpdate;
use crate::services::records::{
    close_record, get_active_records, CloseOutcome, REASON_EXPIRED, REASON_LOSS, REASON_PROFIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StopConfig {
    pub stop_profit_percent: f64,
    pub stop_loss_percent: f64,
    pub max_holding_days: i32,
    pub enabled: bool,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            stop_profit_percent: 15.0,
            stop_loss_percent: -8.0,
            max_holding_days: 30,
            enabled: true,
        }
    }
}

/// Decision produced by `evaluate`: close at the last known valuation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosePlan {
    pub reason: &'static str,
    pub close_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosedRecordInfo {
    pub id: i32,
    pub symbol: String,
    pub profit_percent: f64,
    pub reason: String,
}

#[derive(Clone, Default)]
pub struct AutoClosePolicy {
    config: Arc<RwLock<StopConfig>>,
}

impl AutoClosePolicy {
    pub fn config(&self) -> StopConfig {
        *self.config.read()
    }

    /// Apply a partial update; absent fields keep their current value.
    pub fn apply(&self, update: &StopConfigUpdate) -> StopConfig {
        let mut config = self.config.write();

        if let Some(v) = update.stop_profit_percent {
            config.stop_profit_percent = v;
        }
        if let Some(v) = update.stop_loss_percent {
            config.stop_loss_percent = v;
        }
        if let Some(v) = update.max_holding_days {
            config.max_holding_days = v;
        }
        if let Some(v) = update.enabled {
            config.enabled = v;
        }

        tracing::info!(
            "stop config updated: profit >= {}%, loss <= {}%, max holding {} days, enabled = {}",
            config.stop_profit_percent,
            config.stop_loss_percent,
            config.max_holding_days,
            config.enabled
        );

        *config
    }

    /// Evaluate one active record against the thresholds.
    ///
    /// Rules fire in strict priority order (profit, then loss, then expiry)
    /// so a record crossing several thresholds gets exactly one reason. The
    /// close price is the record's last known valuation, not a fresh quote.
    /// Callers must skip closed records; this never re-checks status.
    pub fn evaluate(&self, record: &recommendation_records::Model) -> Option<ClosePlan> {
        let config = self.config();
        if !config.enabled {
            return None;
        }

        let profit_percent = record.profit_percent.to_f64().unwrap_or(0.0);
        let close_price = record.current_price.unwrap_or(record.entry_price);

        let reason = if profit_percent >= config.stop_profit_percent {
            REASON_PROFIT
        } else if profit_percent <= config.stop_loss_percent {
            REASON_LOSS
        } else if record.holding_days >= config.max_holding_days {
            REASON_EXPIRED
        } else {
            return None;
        };

        Some(ClosePlan {
            reason,
            close_price,
        })
    }
}

/// One full pass over all active records: evaluate each and close the
/// matches. Individual close failures are logged and skipped; the sweep
/// always continues to the next record.
pub async fn run_auto_close_sweep(
    db: &DatabaseConnection,
    policy: &AutoClosePolicy,
) -> Result<Vec<ClosedRecordInfo>, BacktestError> {
    if !policy.config().enabled {
        return Ok(Vec::new());
    }

    let active = get_active_records(db).await?;
    if active.is_empty() {
        tracing::debug!("auto-close sweep: no active records");
        return Ok(Vec::new());
    }

    let mut closed = Vec::new();

    for record in &active {
        let Some(plan) = policy.evaluate(record) else {
            continue;
        };

        tracing::info!(
            "auto-close: {} triggered {} (profit {}%, holding {} days)",
            record.symbol,
            plan.reason,
            record.profit_percent,
            record.holding_days
        );

        let now = Local::now().naive_local();
        match close_record(db, record.id, Some(plan.close_price), plan.reason, now).await {
            Ok(CloseOutcome::Closed(model)) => closed.push(ClosedRecordInfo {
                id: model.id,
                symbol: model.symbol,
                profit_percent: model.profit_percent.to_f64().unwrap_or(0.0),
                reason: plan.reason.to_string(),
            }),
            Ok(CloseOutcome::AlreadyClosed) => {
                tracing::warn!("auto-close: record {} already closed, skipping", record.id)
            }
            Err(e) => {
                tracing::error!("auto-close: failed to close record {}: {}", record.id, e)
            }
        }
    }

    if !closed.is_empty() {
        tracing::info!("auto-close sweep closed {} records", closed.len());
    }

    Ok(closed)
}
