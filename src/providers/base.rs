use crate::errors::Result;
use crate::models::quote::{PriceSeries, Quote};
use crate::models::window::Period;
use async_trait::async_trait;

/// Source of quotes and close histories
#[async_trait]
pub trait QuoteProvider {
    /// Short name used in log lines
    fn provider_name(&self) -> &'static str;

    /// Fetch the current quote for `symbol`.
    /// Returns `DashboardError::NotFound` when the provider has no quote for it.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;

    /// Fetch the daily close series for `symbol` over `period`.
    /// An unknown window or a symbol without history yields an empty series, not an error.
    async fn fetch_history(&self, symbol: &str, period: Period) -> Result<PriceSeries>;
}
