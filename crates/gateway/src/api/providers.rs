//! Provider introspection.

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /v1/providers — run one selection pass and report what it saw:
/// per-provider health and load, plus who would be picked right now.
pub async fn list_providers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let selection = state.selector.select().await;
    Json(serde_json::json!({
        "providers": selection.snapshots,
        "would_select": selection.provider,
        "fallbacks": selection.fallbacks,
        "confidence": selection.confidence,
    }))
}
