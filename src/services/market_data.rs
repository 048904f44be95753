//! Client for the external market data provider.
//!
//! Thin quote lookup over HTTP with a short-lived cache in front, so one
//! update cycle fanning out over many records of the same symbol costs a
//! single upstream call. The provider is allowed to fail or return stale
//! data; callers treat any error as "no quote this cycle".

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

const QUOTE_CACHE_TTL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct MarketDataService {
    client: Client,
    base_url: String,
    cache: Arc<Cache<String, Quote>>,
}

impl MarketDataService {
    pub fn new(base_url: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(1024)
            .time_to_live(QUOTE_CACHE_TTL)
            .build();

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            cache: Arc::new(cache),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("MARKET_DATA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());
        Self::new(base_url)
    }

    /// Fetch the current quote for a symbol.
    ///
    /// Does not filter non-positive prices; the orchestrator decides what
    /// counts as a usable quote.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, BacktestError> {
        if let Some(quote) = self.cache.get(symbol).await {
            tracing::debug!("quote cache hit for {}", symbol);
            return Ok(quote);
        }

        let url = format!("{}/api/quote/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| BacktestError::Provider(format!("{}: {}", symbol, e)))?;

        if !response.status().is_success() {
            return Err(BacktestError::Provider(format!(
                "{}: provider returned {}",
                symbol,
                response.status()
            )));
        }

        let quote: Quote = response
            .json()
            .await
            .map_err(|e| BacktestError::Provider(format!("{}: malformed quote: {}", symbol, e)))?;

        self.cache.insert(symbol.to_string(), quote.clone()).await;

        Ok(quote)
    }

    /// Liveness probe for the health endpoint.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
