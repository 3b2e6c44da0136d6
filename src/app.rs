use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{factsheet, health, index};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::<AppState>::new()
        .merge(index::router())
        .nest("/health", health::router())
        .nest("/api/factsheet", factsheet::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
