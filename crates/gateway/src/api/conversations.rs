//! Conversation introspection and manual takeover/release.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use sb_domain::error::Error;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only conversations currently taken over by an agent.
    #[serde(default)]
    pub taken_over: bool,
}

/// GET /v1/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<serde_json::Value> {
    let conversations = if query.taken_over {
        state.conversations.list_taken_over()
    } else {
        state.conversations.list()
    };
    Json(serde_json::json!({ "conversations": conversations }))
}

/// GET /v1/conversations/:id — aggregate flags plus routing context.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let context = state.contexts.get(&id);
    let conversation = state.conversations.get(&id);
    if context.is_none() && conversation.is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("conversation {id} not found") })),
        )
            .into_response();
    }
    Json(serde_json::json!({
        "conversation": conversation,
        "context": context,
        "watchers": state.takeovers.watcher_count(&id),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct TakeoverBody {
    pub agent_id: String,
}

/// POST /v1/conversations/:id/takeover
pub async fn takeover(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TakeoverBody>,
) -> impl IntoResponse {
    match state.handoff.takeover(&id, &body.agent_id).await {
        Ok(conversation) => Json(serde_json::json!({ "conversation": conversation })).into_response(),
        Err(Error::ConversationNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("conversation {id} not found") })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ReleaseBody {
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /v1/conversations/:id/release — idempotent.
pub async fn release(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReleaseBody>>,
) -> impl IntoResponse {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "agent release".into());
    match state.handoff.release(&id, &reason).await {
        Ok(was_taken_over) => Json(serde_json::json!({
            "released": true,
            "was_taken_over": was_taken_over,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
