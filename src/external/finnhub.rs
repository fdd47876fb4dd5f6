use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::MarketDataError;
use crate::external::market_data::{normalize_symbol, MarketDataProvider};
use crate::models::Resolution;

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub REST client. The API key stays on the server and is sent as a header.
pub struct FinnhubProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FinnhubProvider {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("FINNHUB_API_KEY not set; quote and candle requests will fail until it is configured");
        }

        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, MarketDataError> {
        self.api_key
            .as_deref()
            .ok_or(MarketDataError::MissingCredential)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, MarketDataError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("X-Finnhub-Token", api_key)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketDataError::Upstream {
                status: status.as_u16(),
                message: format!("Finnhub API error: {}", status.as_u16()),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Value, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;
        info!("Fetching Finnhub quote for {}", symbol);
        self.get_json("/quote", &[("symbol", symbol)]).await
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Value, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;
        info!(
            "Fetching Finnhub candles for {} (resolution: {}, from: {}, to: {})",
            symbol,
            resolution.as_str(),
            from,
            to
        );

        let from = from.to_string();
        let to = to.to_string();
        self.get_json(
            "/stock/candle",
            &[
                ("symbol", symbol),
                ("resolution", resolution.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ],
        )
        .await
    }
}
