use serde::{Deserialize, Serialize};

use crate::entities::recommendation_records;
use crate::services::auto_close::{ClosedRecordInfo, StopConfig};

/// Strategy bucket a recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shortterm,
    Trend,
    Value,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shortterm => "shortterm",
            Category::Trend => "trend",
            Category::Value => "value",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shortterm" => Some(Category::Shortterm),
            "trend" => Some(Category::Trend),
            "value" => Some(Category::Value),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    #[serde(default = "default_period")]
    pub period: String,
    pub status: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_period() -> String {
    "30d".to_string()
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<recommendation_records::Model>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SummaryResponse {
    pub total_return: f64,
    pub avg_return: f64,
    pub win_rate: f64,
    pub total_recommendations: u64,
    pub active_count: u64,
    pub closed_count: u64,
    pub avg_holding_days: f64,
    pub best_profit: f64,
    pub worst_loss: f64,
    pub period: String,
}

impl SummaryResponse {
    /// All-zero summary for periods with no matching records.
    pub fn empty(period: &str) -> Self {
        Self {
            total_return: 0.0,
            avg_return: 0.0,
            win_rate: 0.0,
            total_recommendations: 0,
            active_count: 0,
            closed_count: 0,
            avg_holding_days: 0.0,
            best_profit: 0.0,
            worst_loss: 0.0,
            period: period.to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PerformanceResponse {
    pub dates: Vec<String>,
    pub daily_returns: Vec<f64>,
    pub cumulative_returns: Vec<f64>,
    pub daily_count: Vec<u64>,
    pub period: String,
}

#[derive(Debug, Deserialize)]
pub struct CloseQuery {
    pub close_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub success: bool,
    pub message: String,
}

/// Partial update for the stop config: absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct StopConfigUpdate {
    pub stop_profit_percent: Option<f64>,
    pub stop_loss_percent: Option<f64>,
    pub max_holding_days: Option<i32>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StopConfigResponse {
    pub success: bool,
    pub config: StopConfig,
}

#[derive(Debug, Serialize)]
pub struct AutoCloseResponse {
    pub success: bool,
    pub closed_count: usize,
    pub closed_records: Vec<ClosedRecordInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub data_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
