use async_trait::async_trait;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::Resolution;

/// Upstream market data source. Bodies are returned untouched so the
/// gateway routes can pass them through; typed views live in `market_service`.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Value, MarketDataError>;

    async fn fetch_candles(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Value, MarketDataError>;
}

/// Trims the symbol and rejects empty input.
pub fn normalize_symbol(symbol: &str) -> Result<&str, MarketDataError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(MarketDataError::InvalidSymbol);
    }
    Ok(trimmed)
}
