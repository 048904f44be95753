//! Centralised application error type.
//!
//! Handlers return `Result<_, BacktestError>`; the `IntoResponse` impl turns
//! each variant into a structured JSON error body so API clients always get
//! a machine-readable response. `AlreadyClosed` is not modeled here:
//! closing a terminal record is a non-fatal outcome, not an error.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::backtest::ErrorResponse;

#[derive(Debug, Error)]
pub enum BacktestError {
    /// Malformed creation parameters, rejected before any persistence.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation referenced a record id that does not exist.
    #[error("record {0} not found")]
    NotFound(i32),

    /// The market data provider failed or returned an unusable quote.
    #[error("quote provider unavailable: {0}")]
    Provider(String),

    /// Underlying store error during a read or write.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl IntoResponse for BacktestError {
    fn into_response(self) -> Response {
        let status = match &self {
            BacktestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BacktestError::NotFound(_) => StatusCode::NOT_FOUND,
            BacktestError::Provider(_) => StatusCode::BAD_GATEWAY,
            BacktestError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
