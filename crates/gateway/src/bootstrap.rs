//! AppState construction and background-task spawning extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use sb_context::{ConversationContextStore, ConversationLockMap, ConversationStore};
use sb_domain::config::{Config, ConfigSeverity};
use sb_providers::{ProviderRegistry, ProviderSelector};
use sb_routing::{CustomLogicEngine, CustomLogicStore, DecisionEngine};

use crate::runtime::{delivery_from_config, HandoffOps, IdleReclaimer, MessageDispatcher};
use crate::state::AppState;
use crate::takeover::TakeoverRegistry;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(
    config: Arc<Config>,
    shutdown_tx: Arc<tokio::sync::Notify>,
) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    let mut error_count = 0usize;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => {
                tracing::error!("config: {issue}");
                error_count += 1;
            }
        }
    }
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Conversation state stores ────────────────────────────────────
    let state_path = config.state.path.clone();
    let contexts = Arc::new(
        ConversationContextStore::new(&state_path)
            .context("initializing conversation context store")?,
    );
    let conversations =
        Arc::new(ConversationStore::new(&state_path).context("initializing conversation store")?);
    let conversation_locks = Arc::new(ConversationLockMap::new());
    tracing::info!("conversation stores ready");

    // ── Custom logic ─────────────────────────────────────────────────
    let custom_logic =
        Arc::new(CustomLogicStore::new(&state_path).context("initializing custom logic store")?);

    // ── Bot providers ────────────────────────────────────────────────
    let providers = Arc::new(ProviderRegistry::from_config(&config.bots));
    if providers.is_empty() {
        tracing::warn!("no bot providers available — every unmatched message degrades to a human");
    }
    let selector = Arc::new(ProviderSelector::new(
        providers.clone(),
        config.bots.default_timeout_ms,
    ));

    // ── Decision engine ──────────────────────────────────────────────
    let engine = Arc::new(DecisionEngine::new(
        contexts.clone(),
        CustomLogicEngine::new(custom_logic.clone(), config.routing.clone()),
        selector.clone(),
        config.routing.clone(),
    ));
    tracing::info!("decision engine ready");

    // ── Takeover registry + handoff + dispatcher ─────────────────────
    let takeovers = Arc::new(TakeoverRegistry::new());
    let handoff = Arc::new(HandoffOps::new(
        conversation_locks.clone(),
        conversations.clone(),
        contexts.clone(),
    ));
    let delivery = delivery_from_config(&config.channel);
    let dispatcher = Arc::new(MessageDispatcher::new(takeovers.clone(), delivery));
    tracing::info!(
        webhook = config.channel.webhook_url.is_some(),
        "dispatcher ready"
    );

    // ── API token (read once, stored hashed) ─────────────────────────
    let token_env = &config.server.api_token_env;
    let api_token_hash = std::env::var(token_env)
        .ok()
        .filter(|t| !t.is_empty())
        .map(|token| Sha256::digest(token.as_bytes()).to_vec());
    match api_token_hash {
        Some(_) => tracing::info!(env_var = %token_env, "API bearer-token auth enabled"),
        None => tracing::warn!(
            "API bearer-token auth DISABLED; set the {token_env} env var to enable it"
        ),
    }

    Ok(AppState {
        config,
        contexts,
        conversations,
        conversation_locks,
        custom_logic,
        providers,
        selector,
        engine,
        dispatcher,
        takeovers,
        handoff,
        api_token_hash,
        shutdown_tx,
    })
}

/// Spawn the long-running background tokio tasks (store flushes, lock
/// pruning, idle reclamation sweep).
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic store flush ─────────────────────────────────────────
    {
        let contexts = state.contexts.clone();
        let conversations = state.conversations.clone();
        let custom_logic = state.custom_logic.clone();
        let flush_secs = state.config.state.flush_interval_secs;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(flush_secs));
            loop {
                interval.tick().await;
                if let Err(e) = contexts.flush() {
                    tracing::warn!(error = %e, "context store flush failed");
                }
                if let Err(e) = conversations.flush() {
                    tracing::warn!(error = %e, "conversation store flush failed");
                }
                if let Err(e) = custom_logic.flush() {
                    tracing::warn!(error = %e, "custom logic store flush failed");
                }
            }
        });
    }

    // ── Periodic conversation lock pruning ──────────────────────────
    {
        let locks = state.conversation_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                locks.prune_idle();
            }
        });
    }

    // ── Idle reclamation sweep ──────────────────────────────────────
    {
        let reclaimer = IdleReclaimer::new(
            state.handoff.clone(),
            state.conversations.clone(),
            state.config.reclaim.clone(),
        );
        let sweep_secs = state.config.reclaim.sweep_interval_secs;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(sweep_secs));
            loop {
                interval.tick().await;
                reclaimer.tick().await;
            }
        });
    }

    tracing::info!("background tasks spawned");
}
