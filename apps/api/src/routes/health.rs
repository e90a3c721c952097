use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
/// Liveness message.
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Resume tweak API is running" }))
}

/// GET /health
/// Returns a simple status object with service version and the configured provider.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-tweak-api",
        "provider": state.generator.provider(),
        "model": state.generation.model,
    }))
}
