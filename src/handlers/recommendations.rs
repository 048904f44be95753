//! Ingest endpoint for the external recommendation generator.

use axum::{Json, extract::State};
use chrono::Local;

use crate::{
    AppState,
    error::BacktestError,
    models::backtest::Category,
    models::recommendations::{IngestRequest, IngestResponse},
    services::records::batch_create,
};

/// Handler for POST /api/recommendations
///
/// Persists a batch of generator candidates as tracked records. Items that
/// fail validation are logged and skipped; the response counts how many
/// resolved to a record (created or deduplicated against today's entries).
pub async fn ingest_recommendations(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, BacktestError> {
    let category = Category::parse(&request.category).ok_or_else(|| {
        BacktestError::InvalidInput(format!("unknown category: {}", request.category))
    })?;

    if request.stocks.is_empty() {
        return Ok(Json(IngestResponse {
            success: true,
            saved_count: 0,
        }));
    }

    let now = Local::now().naive_local();
    let saved_count = batch_create(&state.db, &request.stocks, category, now).await;

    Ok(Json(IngestResponse {
        success: true,
        saved_count,
    }))
}
