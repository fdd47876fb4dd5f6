use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::external::finnhub;
use crate::services::llm_service::LlmConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub finnhub_api_key: Option<String>,
    pub finnhub_base_url: String,
    pub market_pause: Duration,
    pub ai_bridge_url: Option<String>,
    pub ai_bridge_probe_interval: Duration,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from("./data"),
            finnhub_api_key: None,
            finnhub_base_url: finnhub::DEFAULT_BASE_URL.to_string(),
            market_pause: Duration::from_millis(200),
            ai_bridge_url: None,
            ai_bridge_probe_interval: Duration::from_millis(100),
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let llm = LlmConfig {
            // 0 or unset: no client-side timeout
            request_timeout: Some(parse_or(&var, "LLM_REQUEST_TIMEOUT_SECS", 0u64))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            bridge_wait: Duration::from_secs(parse_or(
                &var,
                "AI_BRIDGE_WAIT_SECS",
                defaults.llm.bridge_wait.as_secs(),
            )),
            ..defaults.llm
        };

        Self {
            port: parse_or(&var, "PORT", defaults.port),
            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            finnhub_api_key: var("FINNHUB_API_KEY"),
            finnhub_base_url: var("FINNHUB_BASE_URL").unwrap_or(defaults.finnhub_base_url),
            market_pause: Duration::from_millis(parse_or(&var, "MARKET_DATA_PAUSE_MS", 200)),
            ai_bridge_url: var("AI_BRIDGE_URL"),
            ai_bridge_probe_interval: Duration::from_millis(parse_or(
                &var,
                "AI_BRIDGE_PROBE_INTERVAL_MS",
                100u64,
            ))
            .max(Duration::from_millis(1)),
            llm,
        }
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: {:?}, using default {}", key, raw, default);
            default
        }),
    }
}
