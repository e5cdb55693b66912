use std::sync::Arc;

use axum::{Router, routing::get};

use crate::app_state::AppState;

use super::handlers;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/snapshot", get(handlers::snapshot))
        .route("/stream/command", get(handlers::stream_command))
        .with_state(state)
}
