pub mod auth;
pub mod conversations;
pub mod decide;
pub mod health;
pub mod providers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the bearer-token middleware). `state` is needed to wire
/// up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health::health));

    let protected = Router::new()
        // Inbound message ingestion (one decision per message)
        .route("/v1/decide", post(decide::decide))
        // Conversation introspection + manual handoff
        .route("/v1/conversations", get(conversations::list_conversations))
        .route("/v1/conversations/:id", get(conversations::get_conversation))
        .route(
            "/v1/conversations/:id/takeover",
            post(conversations::takeover),
        )
        .route(
            "/v1/conversations/:id/release",
            post(conversations::release),
        )
        // Provider health/load snapshot
        .route("/v1/providers", get(providers::list_providers))
        // Agent live-watch WebSocket
        .route("/v1/agents/ws", get(crate::takeover::ws::agent_ws))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}
