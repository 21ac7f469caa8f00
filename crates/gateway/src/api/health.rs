use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /v1/health — liveness probe, no auth.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.providers.len(),
        "agent_connections": state.takeovers.connection_count(),
    }))
}
