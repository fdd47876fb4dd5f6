use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::errors::{AppError, MarketDataError};
use crate::models::{ChartData, Resolution};
use crate::services::market_service;
use crate::state::AppState;

const MISSING_SYMBOL: &str = "Missing required parameter: symbol";
const MISSING_CANDLE_PARAMS: &str = "Missing required parameters: symbol, from, to";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quote", get(get_quote))
        .route("/candles", get(get_candles))
        .route("/chart", get(get_chart))
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandleQuery {
    pub symbol: Option<String>,
    pub resolution: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

struct CandleParams {
    symbol: String,
    resolution: Resolution,
    from: i64,
    to: i64,
}

impl CandleQuery {
    fn into_params(self) -> Result<CandleParams, AppError> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (symbol, from, to) = match (present(self.symbol), present(self.from), present(self.to)) {
            (Some(symbol), Some(from), Some(to)) => (symbol, from, to),
            _ => return Err(AppError::Validation(MISSING_CANDLE_PARAMS.to_string())),
        };

        let epoch = |name: &str, raw: &str| {
            raw.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("Invalid '{}' timestamp: {}", name, raw)))
        };

        let resolution = match present(self.resolution) {
            Some(raw) => raw.parse::<Resolution>().map_err(AppError::Validation)?,
            None => Resolution::default(),
        };

        Ok(CandleParams {
            from: epoch("from", &from)?,
            to: epoch("to", &to)?,
            symbol,
            resolution,
        })
    }
}

/// Quote passthrough: the upstream body is returned unchanged.
pub async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Value>, AppError> {
    let symbol = query
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation(MISSING_SYMBOL.to_string()))?;
    info!("GET /api/quote - Fetching quote for {}", symbol);

    let body = state.market_data.fetch_quote(&symbol).await.map_err(|e| {
        error!("Failed to fetch quote for {}: {}", symbol, e);
        AppError::from(e)
    })?;
    Ok(Json(body))
}

/// Candle passthrough: the upstream body is returned unchanged.
pub async fn get_candles(
    State(state): State<AppState>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Value>, AppError> {
    let params = query.into_params()?;
    info!(
        "GET /api/candles - Fetching {} candles for {} ({} to {})",
        params.resolution.as_str(),
        params.symbol,
        params.from,
        params.to
    );

    let body = state
        .market_data
        .fetch_candles(&params.symbol, params.resolution, params.from, params.to)
        .await
        .map_err(|e| {
            error!("Failed to fetch candles for {}: {}", params.symbol, e);
            AppError::from(e)
        })?;
    Ok(Json(body))
}

/// Typed series for the chart view. No data is not an error.
pub async fn get_chart(
    State(state): State<AppState>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<ChartData>, AppError> {
    let params = query.into_params()?;
    info!("GET /api/chart - Building chart for {}", params.symbol);

    let candles = market_service::get_candles(
        state.market_data.as_ref(),
        &params.symbol,
        params.resolution,
        params.from,
        params.to,
    )
    .await
    .map_err(|e| {
        match &e {
            MarketDataError::MissingCredential => warn!("Chart unavailable for {}: {}", params.symbol, e),
            _ => error!("Failed to build chart for {}: {}", params.symbol, e),
        }
        AppError::from(e)
    })?;

    let (available, points) = match candles {
        Some(points) => (true, points),
        None => (false, Vec::new()),
    };

    Ok(Json(ChartData {
        symbol: params.symbol.to_uppercase(),
        resolution: params.resolution,
        available,
        points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(symbol: Option<&str>, resolution: Option<&str>, from: Option<&str>, to: Option<&str>) -> CandleQuery {
        CandleQuery {
            symbol: symbol.map(String::from),
            resolution: resolution.map(String::from),
            from: from.map(String::from),
            to: to.map(String::from),
        }
    }

    #[test]
    fn test_candle_params_default_to_daily() {
        let params = query(Some("AAPL"), None, Some("1700000000"), Some("1700600000"))
            .into_params()
            .unwrap();
        assert_eq!(params.resolution, Resolution::Daily);
        assert_eq!(params.from, 1_700_000_000);
        assert_eq!(params.to, 1_700_600_000);
    }

    #[test]
    fn test_candle_params_require_symbol_from_to() {
        let err = query(Some("AAPL"), Some("D"), None, Some("1")).into_params().err().unwrap();
        assert_eq!(err.to_string(), MISSING_CANDLE_PARAMS);

        let err = query(Some(" "), None, Some("1"), Some("2")).into_params().err().unwrap();
        assert_eq!(err.to_string(), MISSING_CANDLE_PARAMS);
    }

    #[test]
    fn test_candle_params_reject_bad_values() {
        assert!(query(Some("AAPL"), Some("2h"), Some("1"), Some("2")).into_params().is_err());
        assert!(query(Some("AAPL"), None, Some("yesterday"), Some("2")).into_params().is_err());
    }
}
