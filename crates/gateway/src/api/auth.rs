//! Bearer-token gate for the protected API surface.
//!
//! The token itself never lives in `AppState`; bootstrap reads the env
//! var named by `config.server.api_token_env` once and keeps only its
//! SHA-256 digest. `None` means no token was configured and the gate is
//! open (dev mode).

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Middleware for protected routes; attach with
/// `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_token_hash else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or_default();

    // Compare digests, not tokens: fixed 32-byte ct_eq regardless of
    // what the client sent.
    let digest = Sha256::digest(presented.as_bytes());
    if bool::from(digest.ct_eq(expected.as_slice())) {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid or missing API token" })),
        )
            .into_response()
    }
}
