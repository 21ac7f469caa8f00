//! Inbound message ingestion.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use sb_routing::DecideRequest;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DecideBody {
    pub conversation_id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub bot_id: String,
    #[serde(default)]
    pub intent: Option<String>,
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// POST /v1/decide — the single entry point per inbound message.
///
/// Routes the message, executes the decision's side effects (outbound
/// delivery + agent fan-out) and returns the full outcome.
pub async fn decide(
    State(state): State<AppState>,
    Json(body): Json<DecideBody>,
) -> impl IntoResponse {
    let req = DecideRequest {
        conversation_id: body.conversation_id,
        user_id: body.user_id,
        tenant_id: body.tenant_id,
        bot_id: body.bot_id,
        intent: body.intent,
        message: body.message,
        language: body.language,
    };

    match state.engine.decide(req.clone()).await {
        Ok(outcome) => {
            state.dispatcher.dispatch(&req, &outcome).await;
            Json(outcome).into_response()
        }
        Err(e) => {
            tracing::error!(
                conversation_id = %req.conversation_id,
                error = %e,
                "decide failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
