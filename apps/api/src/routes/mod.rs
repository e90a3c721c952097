pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tweak::handlers;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/list_models", get(handlers::handle_list_models))
        .route("/tweak_resume", post(handlers::handle_tweak_resume))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
