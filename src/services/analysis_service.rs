use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::external::market_data::MarketDataProvider;
use crate::models::{AnalysisConfig, AnalysisResult, Transaction};
use crate::services::llm_service::ProviderDispatcher;
use crate::services::market_service;
use crate::services::normalizer::ResponseNormalizer;
use crate::services::prompt_service;

/// Collaborators for one analysis run.
pub struct AnalysisContext<'a> {
    pub market_data: &'a dyn MarketDataProvider,
    pub dispatcher: &'a ProviderDispatcher,
    pub normalizer: &'a dyn ResponseNormalizer,
    pub market_pause: Duration,
}

/// Runs prompt construction, dispatch and normalisation. Every failure ends up
/// in the returned result's `error` field.
pub async fn analyze_portfolio(
    ctx: &AnalysisContext<'_>,
    transactions: &[Transaction],
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> AnalysisResult {
    if transactions.is_empty() {
        info!("Portfolio is empty, skipping analysis");
        return AnalysisResult::empty_portfolio();
    }

    info!(
        "Analyzing {} transactions with {} (language: {})",
        transactions.len(),
        config.provider.display_name(),
        config.language
    );

    // Configuration problems are reported before any market data is spent.
    if let Err(e) = ctx.dispatcher.prepare(config.provider, &config.credential).await {
        warn!("Analysis not started: {}", e);
        return AnalysisResult::failed(e.user_message());
    }

    let symbols: Vec<String> = transactions.iter().map(|t| t.ticker.clone()).collect();
    let snapshots = market_service::fetch_snapshots(ctx.market_data, &symbols, ctx.market_pause).await;

    let prompt = prompt_service::build_prompt(transactions, &snapshots, config, now);

    let raw = match ctx
        .dispatcher
        .dispatch(config.provider, &config.credential, &prompt)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            if e.is_configuration() {
                warn!("AI analysis not possible: {}", e);
            } else {
                error!("AI analysis failed: {}", e);
            }
            return AnalysisResult::failed(e.user_message());
        }
    };

    let result = ctx.normalizer.normalize(&raw);
    info!(
        "Analysis complete ({} insights, {} recommendations)",
        result.insights.len(),
        result.recommendations.len()
    );
    result
}
