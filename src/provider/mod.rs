//! Financial-data provider contract

use crate::models::FilingRecord;
use crate::Result;
use async_trait::async_trait;

pub mod polygon;
pub use polygon::PolygonClient;

/// Source of structured annual filings.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// The annual filing for `ticker` whose filing date falls in `year`,
    /// or `None` when the provider has nothing for that window.
    async fn get_annual_filing(&self, ticker: &str, year: i32) -> Result<Option<FilingRecord>>;
}
