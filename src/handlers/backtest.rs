//! Backtest API: record listing, statistics, manual close, stop config and
//! the manual triggers for the auto-close sweep and the price update cycle.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Local;
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::BacktestError,
    models::backtest::{
        AutoCloseResponse, CloseQuery, CloseResponse, HealthResponse, PerformanceResponse,
        PeriodQuery, RecordsQuery, RecordsResponse, StopConfigResponse, StopConfigUpdate,
        SummaryResponse,
    },
    services::{
        auto_close::{StopConfig, run_auto_close_sweep},
        performance,
        price_updater::{CycleReport, run_price_update_cycle},
        records::{self, CloseOutcome},
    },
};

/// Handler for GET /
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        data_available: state.market_data.is_available().await,
    })
}

/// Handler for GET /api/backtest/records
pub async fn get_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, BacktestError> {
    let now = Local::now().naive_local();

    let (records, total) = records::get_records(
        &state.db,
        &query.period,
        query.status.as_deref(),
        query.category.as_deref(),
        query.page,
        query.page_size,
        now,
    )
    .await?;

    Ok(Json(RecordsResponse {
        records,
        total,
        page: query.page.max(1),
        page_size: query.page_size,
    }))
}

/// Handler for GET /api/backtest/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<SummaryResponse>, BacktestError> {
    let now = Local::now().naive_local();
    let summary = performance::summary(&state.db, &query.period, now).await?;
    Ok(Json(summary))
}

/// Handler for GET /api/backtest/performance
pub async fn get_performance(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<PerformanceResponse>, BacktestError> {
    let now = Local::now().naive_local();
    let curve = performance::performance_curve(&state.db, &query.period, now).await?;
    Ok(Json(curve))
}

/// Handler for POST /api/backtest/close/{id}
///
/// Manual close. Without an explicit `close_price` the record's last known
/// price is used. An already-closed record is a non-fatal failure in the
/// response body, not an HTTP error.
pub async fn close_position(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<CloseQuery>,
) -> Result<Json<CloseResponse>, BacktestError> {
    let close_price = match query.close_price {
        Some(price) if price <= 0.0 => {
            return Err(BacktestError::InvalidInput(format!(
                "close price must be positive, got {}",
                price
            )));
        }
        Some(price) => Some(Decimal::from_f64_retain(price).ok_or_else(|| {
            BacktestError::InvalidInput(format!("unrepresentable close price: {}", price))
        })?),
        None => None,
    };

    let now = Local::now().naive_local();

    match records::close_record(&state.db, id, close_price, records::REASON_MANUAL, now).await? {
        CloseOutcome::Closed(record) => Ok(Json(CloseResponse {
            success: true,
            message: format!(
                "closed {} at {}, profit {}%",
                record.symbol,
                record.close_price.unwrap_or(record.entry_price),
                record.profit_percent
            ),
        })),
        CloseOutcome::AlreadyClosed => Ok(Json(CloseResponse {
            success: false,
            message: format!("record {} is already closed", id),
        })),
    }
}

/// Handler for GET /api/backtest/stop-config
pub async fn get_stop_config(State(state): State<AppState>) -> Json<StopConfig> {
    Json(state.auto_close.config())
}

/// Handler for POST /api/backtest/stop-config (partial update)
pub async fn set_stop_config(
    State(state): State<AppState>,
    Json(update): Json<StopConfigUpdate>,
) -> Json<StopConfigResponse> {
    let config = state.auto_close.apply(&update);
    Json(StopConfigResponse {
        success: true,
        config,
    })
}

/// Handler for POST /api/backtest/check-auto-close
///
/// Synchronous manual trigger of one auto-close sweep.
pub async fn check_auto_close(
    State(state): State<AppState>,
) -> Result<Json<AutoCloseResponse>, BacktestError> {
    let closed = run_auto_close_sweep(&state.db, &state.auto_close).await?;
    Ok(Json(AutoCloseResponse {
        success: true,
        closed_count: closed.len(),
        closed_records: closed,
    }))
}

/// Handler for POST /api/backtest/update-prices
///
/// On-demand trigger of one full price update cycle. Reports `skipped: true`
/// when a cycle is already in flight.
pub async fn update_prices(
    State(state): State<AppState>,
) -> Result<Json<CycleReport>, BacktestError> {
    let report = run_price_update_cycle(
        &state.db,
        &state.market_data,
        &state.auto_close,
        &state.cycle_gate,
    )
    .await?;

    Ok(Json(report))
}
