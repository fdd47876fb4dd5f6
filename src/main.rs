use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use aimystocks_backend::app;
use aimystocks_backend::config::AppConfig;
use aimystocks_backend::external::finnhub::FinnhubProvider;
use aimystocks_backend::logging::{init_logging, LoggingConfig};
use aimystocks_backend::models::AnalysisResult;
use aimystocks_backend::services::ai_bridge::{spawn_bridge_probe, BridgeSlot};
use aimystocks_backend::services::holdings_service::HoldingsStore;
use aimystocks_backend::services::llm_service::ProviderDispatcher;
use aimystocks_backend::services::normalizer::StructuredNormalizer;
use aimystocks_backend::state::AppState;
use aimystocks_backend::store::analysis_cell::AnalysisCell;
use aimystocks_backend::store::local_store::{LocalStore, RESULT_KEY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).context("failed to initialize logging")?;

    let config = AppConfig::from_env();

    let store = Arc::new(
        LocalStore::open(&config.data_dir)
            .await
            .with_context(|| format!("failed to open data dir {}", config.data_dir.display()))?,
    );
    let holdings = Arc::new(HoldingsStore::load(store.clone()).await?);
    let last_result: AnalysisResult = store.load(RESULT_KEY).await?.unwrap_or_default();

    let bridge = Arc::new(BridgeSlot::new());
    match &config.ai_bridge_url {
        Some(url) => {
            tracing::info!("🔌 Probing AI bridge at {}", url);
            spawn_bridge_probe(bridge.clone(), url.clone(), config.ai_bridge_probe_interval);
        }
        None => tracing::warn!("AI_BRIDGE_URL not set; the keyless AI service will be unavailable"),
    }
    let dispatcher = ProviderDispatcher::from_config(&config.llm, bridge)?;

    let state = AppState {
        market_data: Arc::new(FinnhubProvider::new(
            config.finnhub_api_key.clone(),
            config.finnhub_base_url.clone(),
        )),
        store,
        holdings,
        analysis: Arc::new(AnalysisCell::new(last_result)),
        dispatcher: Arc::new(dispatcher),
        normalizer: Arc::new(StructuredNormalizer),
        market_pause: config.market_pause,
    };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 AImySTOCKS backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
