// src/lib.rs

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use services::{auto_close::AutoClosePolicy, market_data::MarketDataService};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub market_data: MarketDataService,
    pub auto_close: AutoClosePolicy,
    /// Single-admission gate around the price update cycle: the periodic job
    /// and the manual trigger both funnel through it so cycles never overlap.
    pub cycle_gate: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, market_data: MarketDataService) -> Self {
        Self {
            db,
            market_data,
            auto_close: AutoClosePolicy::default(),
            cycle_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

pub mod entities {
    pub mod prelude;
    pub mod recommendation_records;
}

pub mod services {
    pub mod auto_close;
    pub mod market_data;
    pub mod performance;
    pub mod price_updater;
    pub mod records;
    pub mod valuation;
}

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
