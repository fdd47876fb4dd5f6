use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{analysis, health, holdings, market, settings};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api", market::router())
        .nest("/api/holdings", holdings::router())
        .nest("/api/analysis", analysis::router())
        .nest("/api/settings", settings::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
