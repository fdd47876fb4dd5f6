use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{AnalysisPreferences, UpdatePreferences};
use crate::services::settings_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<AnalysisPreferences>, AppError> {
    info!("GET /api/settings - Loading analysis preferences");
    let prefs = settings_service::load(&state.store).await.map_err(|e| {
        error!("Failed to load preferences: {}", e);
        e
    })?;
    Ok(Json(prefs))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<UpdatePreferences>,
) -> Result<Json<AnalysisPreferences>, AppError> {
    info!("PUT /api/settings - Updating analysis preferences");
    let prefs = settings_service::update(&state.store, update).await.map_err(|e| {
        error!("Failed to update preferences: {}", e);
        e
    })?;
    Ok(Json(prefs))
}
