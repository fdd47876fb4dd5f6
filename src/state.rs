use std::sync::Arc;
use std::time::Duration;

use crate::external::market_data::MarketDataProvider;
use crate::services::holdings_service::HoldingsStore;
use crate::services::llm_service::ProviderDispatcher;
use crate::services::normalizer::ResponseNormalizer;
use crate::store::analysis_cell::AnalysisCell;
use crate::store::local_store::LocalStore;

#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataProvider>,
    pub store: Arc<LocalStore>,
    pub holdings: Arc<HoldingsStore>,
    pub analysis: Arc<AnalysisCell>,
    pub dispatcher: Arc<ProviderDispatcher>,
    pub normalizer: Arc<dyn ResponseNormalizer>,
    /// Pause between sequential quote calls during analysis.
    pub market_pause: Duration,
}
