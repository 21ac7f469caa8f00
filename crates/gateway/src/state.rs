use std::sync::Arc;

use sb_context::{ConversationContextStore, ConversationLockMap, ConversationStore};
use sb_domain::config::Config;
use sb_providers::{ProviderRegistry, ProviderSelector};
use sb_routing::{CustomLogicStore, DecisionEngine};

use crate::runtime::{HandoffOps, MessageDispatcher};
use crate::takeover::TakeoverRegistry;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Conversation state ────────────────────────────────────────────
    pub contexts: Arc<ConversationContextStore>,
    pub conversations: Arc<ConversationStore>,
    pub conversation_locks: Arc<ConversationLockMap>,

    // ── Routing pipeline ──────────────────────────────────────────────
    pub custom_logic: Arc<CustomLogicStore>,
    pub providers: Arc<ProviderRegistry>,
    pub selector: Arc<ProviderSelector>,
    pub engine: Arc<DecisionEngine>,
    pub dispatcher: Arc<MessageDispatcher>,

    // ── Takeover ──────────────────────────────────────────────────────
    pub takeovers: Arc<TakeoverRegistry>,
    pub handoff: Arc<HandoffOps>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,

    // ── Shutdown coordination ─────────────────────────────────────────
    pub shutdown_tx: Arc<tokio::sync::Notify>,
}
