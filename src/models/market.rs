use serde::{Deserialize, Serialize};

/// Point-in-time quote for one ticker, used to enrich the analysis prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub day_open: f64,
    pub previous_close: f64,
    pub fetched_at_epoch_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle resolutions accepted by the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1")]
    OneMinute,
    #[serde(rename = "5")]
    FiveMinutes,
    #[serde(rename = "15")]
    FifteenMinutes,
    #[serde(rename = "30")]
    ThirtyMinutes,
    #[serde(rename = "60")]
    Hourly,
    #[default]
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "W")]
    Weekly,
    #[serde(rename = "M")]
    Monthly,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::OneMinute => "1",
            Resolution::FiveMinutes => "5",
            Resolution::FifteenMinutes => "15",
            Resolution::ThirtyMinutes => "30",
            Resolution::Hourly => "60",
            Resolution::Daily => "D",
            Resolution::Weekly => "W",
            Resolution::Monthly => "M",
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Resolution::OneMinute),
            "5" => Ok(Resolution::FiveMinutes),
            "15" => Ok(Resolution::FifteenMinutes),
            "30" => Ok(Resolution::ThirtyMinutes),
            "60" => Ok(Resolution::Hourly),
            "D" | "d" => Ok(Resolution::Daily),
            "W" | "w" => Ok(Resolution::Weekly),
            "M" | "m" => Ok(Resolution::Monthly),
            other => Err(format!("Invalid resolution: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub symbol: String,
    pub resolution: Resolution,
    pub available: bool,
    pub points: Vec<Candle>,
}
