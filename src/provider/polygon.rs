//! Polygon.io financials client
//!
//! Wraps `GET /vX/reference/financials`, asking for at most one annual filing
//! filed inside the requested calendar year.

use crate::error::OrchestrationError;
use crate::models::FilingRecord;
use crate::provider::FinancialDataProvider;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

#[derive(Clone)]
pub struct PolygonClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PolygonClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl FinancialDataProvider for PolygonClient {
    async fn get_annual_filing(&self, ticker: &str, year: i32) -> Result<Option<FilingRecord>> {
        let url = format!("{}/vX/reference/financials", self.base_url);

        debug!(ticker, year, "Fetching annual financials from Polygon");

        let response = self
            .client
            .get(url)
            .query(&filing_query(ticker, year, &self.api_key))
            .send()
            .await
            .map_err(|e| {
                error!("Polygon request failed for {} {}: {}", ticker, year, e);
                OrchestrationError::ProviderError(format!("Polygon request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OrchestrationError::ProviderError(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(OrchestrationError::ProviderError(format!(
                "Polygon returned {} for {} {}: {}",
                status, ticker, year, body
            )));
        }

        Ok(first_result(body))
    }
}

fn filing_query(ticker: &str, year: i32, api_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("ticker", ticker.to_string()),
        ("timeframe", "annual".to_string()),
        ("filing_date.gte", format!("{}-01-01", year)),
        ("filing_date.lte", format!("{}-12-31", year)),
        ("limit", "1".to_string()),
        ("apiKey", api_key.to_string()),
    ]
}

fn first_result(mut body: Value) -> Option<FilingRecord> {
    match body.get_mut("results").and_then(Value::as_array_mut) {
        Some(results) if !results.is_empty() => Some(results.swap_remove(0)),
        _ => None,
    }
}
