//! WebSocket endpoint for agent live-watch connections.
//!
//! Flow:
//! 1. Agent connects to `/v1/agents/ws?token=<pre-shared-token>`
//! 2. Agent sends `{"watch": "<conversation_id>"}` text commands; each
//!    one atomically moves the subscription
//! 3. Gateway pushes every [`TakeoverMessage`] routed through the
//!    watched conversation as JSON text frames
//! 4. Disconnect (or a stale close) unsubscribes the connection

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;

use sb_domain::conversation::TakeoverMessage;

use crate::state::AppState;

/// Constant-time token comparison via SHA-256 digest. Hashing
/// normalizes lengths so ct_eq always compares 32 bytes.
fn token_eq(a: &str, b: &str) -> bool {
    let ha = Sha256::digest(a.as_bytes());
    let hb = Sha256::digest(b.as_bytes());
    ha.ct_eq(&hb).into()
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Pre-shared token for agent authentication.
    pub token: Option<String>,
    /// Agent identifier, for logs only.
    pub agent_id: Option<String>,
}

/// Inbound text command on the agent socket.
#[derive(Debug, Deserialize)]
struct WatchCommand {
    watch: String,
}

/// GET /v1/agents/ws — upgrade to WebSocket.
///
/// The expected token comes from the env var named by
/// `config.server.agent_token_env`. Unset env var = open access (dev
/// mode).
pub async fn agent_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if let Ok(expected) = std::env::var(&state.config.server.agent_token_env) {
        let provided = query.token.as_deref().unwrap_or("");
        if !token_eq(provided, &expected) {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                "invalid or missing agent token",
            )
                .into_response();
        }
    }

    let agent_id = query.agent_id.unwrap_or_else(|| "unknown".into());
    ws.on_upgrade(move |socket| handle_socket(socket, state, agent_id))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, agent_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        connection_id = %connection_id,
        agent_id = %agent_id,
        "agent connected"
    );

    // Outbound channel: broadcasts land here, the writer task forwards
    // them to the socket.
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<TakeoverMessage>(64);

    let writer_connection_id = connection_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize takeover message");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(json)).await.is_err() {
                tracing::debug!(
                    connection_id = %writer_connection_id,
                    "agent socket closed while writing"
                );
                break;
            }
        }
    });

    // Reader loop: watch commands move the subscription; anything else
    // is ignored.
    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<WatchCommand>(&text) {
                Ok(cmd) => {
                    state
                        .takeovers
                        .watch(&connection_id, &cmd.watch, outbound_tx.clone());
                    // Watching counts as agent activity: reset the idle
                    // clock so the reclaimer does not release underneath
                    // a connected agent.
                    state.conversations.touch(&cmd.watch);
                }
                Err(_) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "ignoring unrecognized agent command"
                    );
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    // Unsubscribe on the way out; idempotent if the agent never watched
    // anything.
    state.takeovers.unwatch(&connection_id);
    writer.abort();

    tracing::info!(
        connection_id = %connection_id,
        agent_id = %agent_id,
        "agent disconnected"
    );
}
