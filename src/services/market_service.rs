use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::MarketDataError;
use crate::external::market_data::MarketDataProvider;
use crate::models::{Candle, MarketSnapshot, Resolution};

/// Typed quote. `None` when the upstream has no current price for the symbol.
pub async fn get_quote(
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> Result<Option<MarketSnapshot>, MarketDataError> {
    let body = provider.fetch_quote(symbol).await?;
    Ok(snapshot_from_quote(symbol.trim(), &body, Utc::now().timestamp_millis()))
}

/// Typed candle series. `None` when the upstream reports no data for the range.
pub async fn get_candles(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    resolution: Resolution,
    from: i64,
    to: i64,
) -> Result<Option<Vec<Candle>>, MarketDataError> {
    let body = provider.fetch_candles(symbol, resolution, from, to).await?;
    candles_from_body(&body)
}

/// Fetches one quote per distinct symbol, sequentially, pausing `pause` between
/// calls. Symbols that fail or have no quote are logged and left out.
pub async fn fetch_snapshots(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    pause: Duration,
) -> Vec<MarketSnapshot> {
    let mut unique: Vec<&str> = Vec::new();
    for symbol in symbols {
        let symbol = symbol.trim();
        if !symbol.is_empty() && !unique.contains(&symbol) {
            unique.push(symbol);
        }
    }

    let mut snapshots = Vec::with_capacity(unique.len());
    for (idx, symbol) in unique.iter().enumerate() {
        if idx > 0 && !pause.is_zero() {
            sleep(pause).await;
        }

        match get_quote(provider, symbol).await {
            Ok(Some(snapshot)) => snapshots.push(snapshot),
            Ok(None) => warn!("No current quote for {}, leaving it out of the market data", symbol),
            Err(e) => warn!("Failed to fetch market data for {}: {}", symbol, e),
        }
    }

    info!("Fetched market snapshots for {}/{} symbols", snapshots.len(), unique.len());
    snapshots
}

fn number(body: &Value, field: &str) -> f64 {
    body.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

pub fn snapshot_from_quote(symbol: &str, body: &Value, fetched_at: i64) -> Option<MarketSnapshot> {
    let current_price = body.get("c").and_then(Value::as_f64)?;
    if current_price == 0.0 {
        return None;
    }

    Some(MarketSnapshot {
        symbol: symbol.to_string(),
        current_price,
        change: number(body, "d"),
        change_percent: number(body, "dp"),
        day_high: number(body, "h"),
        day_low: number(body, "l"),
        day_open: number(body, "o"),
        previous_close: number(body, "pc"),
        fetched_at_epoch_millis: fetched_at,
    })
}

pub fn candles_from_body(body: &Value) -> Result<Option<Vec<Candle>>, MarketDataError> {
    match body.get("s").and_then(Value::as_str) {
        Some("ok") => {}
        Some("no_data") => return Ok(None),
        Some(other) => {
            return Err(MarketDataError::Parse(format!("unexpected candle status: {}", other)))
        }
        None => return Err(MarketDataError::Parse("missing candle status".to_string())),
    }

    let column = |name: &str| -> Result<Vec<f64>, MarketDataError> {
        body.get(name)
            .and_then(Value::as_array)
            .map(|values| values.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect())
            .ok_or_else(|| MarketDataError::Parse(format!("missing candle column '{}'", name)))
    };

    let timestamps = column("t")?;
    let opens = column("o")?;
    let highs = column("h")?;
    let lows = column("l")?;
    let closes = column("c")?;
    // Volume is absent for some instruments.
    let volumes = column("v").unwrap_or_else(|_| vec![0.0; timestamps.len()]);

    let len = timestamps.len();
    if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()]
        .iter()
        .any(|&l| l != len)
    {
        return Err(MarketDataError::Parse("candle columns have different lengths".to_string()));
    }

    let mut candles: Vec<Candle> = (0..len)
        .map(|i| Candle {
            timestamp: timestamps[i] as i64,
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: volumes[i],
        })
        .collect();
    candles.sort_by_key(|c| c.timestamp);

    Ok(Some(candles))
}
