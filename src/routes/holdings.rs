use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{CreateTransaction, PortfolioSummary, Transaction};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_holdings).post(create_holding))
        .route("/summary", get(get_summary))
        .route("/:id", delete(delete_holding))
}

pub async fn list_holdings(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    info!("GET /api/holdings - Listing transactions");
    Json(state.holdings.list().await)
}

pub async fn create_holding(
    State(state): State<AppState>,
    Json(data): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    info!("POST /api/holdings - Recording {:?} of {}", data.transaction_type, data.ticker);
    let transaction = state.holdings.add(data).await.map_err(|e| {
        match &e {
            AppError::Validation(msg) => warn!("Invalid transaction: {}", msg),
            _ => error!("Failed to record transaction: {}", e),
        }
        e
    })?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn delete_holding(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /api/holdings/{} - Removing transaction", id);
    let removed = state.holdings.remove(&id).await.map_err(|e| {
        error!("Failed to remove transaction {}: {}", id, e);
        e
    })?;

    if !removed {
        return Err(AppError::NotFound(format!("Transaction {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_summary(State(state): State<AppState>) -> Json<PortfolioSummary> {
    info!("GET /api/holdings/summary - Summarizing portfolio");
    Json(state.holdings.summary().await)
}
