use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::errors::GENERIC_ANALYSIS_FAILURE;
use crate::models::{AnalysisConfig, AnalysisRequest, AnalysisResult, AnalysisState};
use crate::services::analysis_service::{self, AnalysisContext};
use crate::services::settings_service;
use crate::state::AppState;
use crate::store::analysis_cell::RequestTicket;
use crate::store::local_store::RESULT_KEY;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_analysis).post(run_analysis))
}

pub async fn get_analysis(State(state): State<AppState>) -> Json<AnalysisState> {
    info!("GET /api/analysis - Returning last analysis");
    Json(state.analysis.snapshot())
}

/// Runs the pipeline. Failures are reported inside the result, so the
/// response is always 200. The work runs on its own task and finishes even
/// if the client goes away.
pub async fn run_analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Json<AnalysisResult> {
    info!("POST /api/analysis - Analysis requested with {}", request.provider);
    let ticket = state.analysis.begin();

    let task = tokio::spawn(analyze_and_store(state, ticket, request));
    let result = task.await.unwrap_or_else(|e| {
        error!("Analysis task failed: {}", e);
        AnalysisResult::failed(GENERIC_ANALYSIS_FAILURE)
    });

    Json(result)
}

async fn analyze_and_store(state: AppState, ticket: RequestTicket, request: AnalysisRequest) -> AnalysisResult {
    let result = match request.into_config() {
        Ok(config) => run_pipeline(&state, &config).await,
        Err(e) => {
            warn!("Rejected analysis request: {}", e);
            AnalysisResult::failed(e.user_message())
        }
    };

    if state.analysis.complete(ticket, result.clone()) {
        if let Err(e) = state.store.save(RESULT_KEY, &result).await {
            error!("Failed to persist analysis result: {}", e);
        }
    }
    result
}

async fn run_pipeline(state: &AppState, config: &AnalysisConfig) -> AnalysisResult {
    if let Err(e) = settings_service::remember(&state.store, config).await {
        warn!("Failed to remember analysis preferences: {}", e);
    }

    let transactions = state.holdings.list().await;
    let ctx = AnalysisContext {
        market_data: state.market_data.as_ref(),
        dispatcher: state.dispatcher.as_ref(),
        normalizer: state.normalizer.as_ref(),
        market_pause: state.market_pause,
    };
    analysis_service::analyze_portfolio(&ctx, &transactions, config, Utc::now()).await
}
