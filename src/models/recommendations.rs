use serde::{Deserialize, Serialize};

/// One candidate produced by the external recommendation generator.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateStock {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub recommendation: Option<String>,
    pub ai_score: Option<i32>,
    pub signal: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub category: String,
    pub stocks: Vec<CandidateStock>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub saved_count: usize,
}
