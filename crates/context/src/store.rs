//! Gateway-owned conversation state stores.
//!
//! Two JSON-file-backed stores live under the configured state path:
//! `contexts.json` holds per-conversation routing state
//! ([`ConversationContext`]) and `conversations.json` holds the
//! takeover/status flags ([`Conversation`]). Both keep everything in
//! memory behind a `parking_lot::RwLock` and are flushed periodically
//! and on shutdown.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;

use sb_domain::conversation::{Conversation, ConversationContext, ConversationStatus, HandlerType};
use sb_domain::error::{Error, Result};
use sb_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Store for per-conversation routing state, keyed by conversation id.
pub struct ConversationContextStore {
    path: PathBuf,
    contexts: RwLock<HashMap<String, ConversationContext>>,
}

impl ConversationContextStore {
    /// Load or create the store at `state_path/contexts.json`.
    pub fn new(state_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_path).map_err(Error::Io)?;
        let path = state_path.join("contexts.json");
        let contexts = load_map(&path)?;

        tracing::info!(
            contexts = contexts.len(),
            path = %path.display(),
            "conversation context store loaded"
        );

        Ok(Self {
            path,
            contexts: RwLock::new(contexts),
        })
    }

    /// Look up a context by conversation id.
    pub fn get(&self, conversation_id: &str) -> Option<ConversationContext> {
        self.contexts.read().get(conversation_id).cloned()
    }

    /// Resolve or create the context for a conversation. Returns
    /// `(context, is_new)`.
    ///
    /// Safe under the duplicate-create race: two near-simultaneous first
    /// messages both reach the write path, but `entry()` makes the loser
    /// observe the winner's row instead of erroring or overwriting it.
    pub fn get_or_create(
        &self,
        conversation_id: &str,
        user_id: &str,
        tenant_id: &str,
    ) -> (ConversationContext, bool) {
        // Fast path: context already exists.
        {
            let contexts = self.contexts.read();
            if let Some(ctx) = contexts.get(conversation_id) {
                return (ctx.clone(), false);
            }
        }

        // Slow path: create under the write lock.
        let mut contexts = self.contexts.write();
        if let Some(ctx) = contexts.get(conversation_id) {
            return (ctx.clone(), false);
        }
        let ctx = ConversationContext::new(conversation_id, user_id, tenant_id);
        contexts.insert(conversation_id.to_owned(), ctx.clone());

        TraceEvent::ContextResolved {
            conversation_id: conversation_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            is_new: true,
        }
        .emit();

        (ctx, true)
    }

    /// Persist a mutated context. Last-writer-wins; takeover transitions
    /// are serialized by the caller's per-conversation lock.
    pub fn save(&self, mut context: ConversationContext) {
        context.touch();
        self.contexts
            .write()
            .insert(context.conversation_id.clone(), context);
    }

    /// Set the handler type without touching the rest of the context.
    pub fn set_handler(&self, conversation_id: &str, handler: HandlerType) {
        let mut contexts = self.contexts.write();
        if let Some(ctx) = contexts.get_mut(conversation_id) {
            ctx.handler_type = handler;
            ctx.touch();
        }
    }

    pub fn list(&self) -> Vec<ConversationContext> {
        self.contexts.read().values().cloned().collect()
    }

    /// Contexts currently held by a human (for introspection endpoints).
    pub fn list_human_held(&self) -> Vec<ConversationContext> {
        self.contexts
            .read()
            .values()
            .filter(|c| c.is_human_held())
            .cloned()
            .collect()
    }

    /// Persist the current state to disk.
    pub fn flush(&self) -> Result<()> {
        let contexts = self.contexts.read();
        write_map(&self.path, &contexts)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation flag store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Store for the conversation aggregate flags the routing core owns:
/// `taken_over_by_agent`, `status`, `agent_assigned_id`, `updated_at`.
pub struct ConversationStore {
    path: PathBuf,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    /// Load or create the store at `state_path/conversations.json`.
    pub fn new(state_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_path).map_err(Error::Io)?;
        let path = state_path.join("conversations.json");
        let conversations = load_map(&path)?;

        tracing::info!(
            conversations = conversations.len(),
            path = %path.display(),
            "conversation store loaded"
        );

        Ok(Self {
            path,
            conversations: RwLock::new(conversations),
        })
    }

    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations.read().get(conversation_id).cloned()
    }

    pub fn get_or_create(&self, conversation_id: &str, tenant_id: &str) -> Conversation {
        {
            let conversations = self.conversations.read();
            if let Some(conv) = conversations.get(conversation_id) {
                return conv.clone();
            }
        }
        let mut conversations = self.conversations.write();
        conversations
            .entry(conversation_id.to_owned())
            .or_insert_with(|| Conversation::new(conversation_id, tenant_id))
            .clone()
    }

    /// Persist a conversation as-is, `updated_at` included. Takeover
    /// transitions go through [`set_takeover`](Self::set_takeover) and
    /// [`clear_takeover`](Self::clear_takeover) instead.
    pub fn save(&self, conversation: Conversation) {
        self.conversations
            .write()
            .insert(conversation.conversation_id.clone(), conversation);
    }

    /// Mark a conversation as taken over by `agent_id`.
    pub fn set_takeover(&self, conversation_id: &str, agent_id: &str) -> Result<Conversation> {
        let mut conversations = self.conversations.write();
        let conv = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_owned()))?;
        conv.taken_over_by_agent = true;
        conv.agent_assigned_id = Some(agent_id.to_owned());
        conv.updated_at = Utc::now();
        Ok(conv.clone())
    }

    /// Clear the takeover flag and reopen the conversation.
    ///
    /// Idempotent: releasing an already-released conversation returns
    /// `false` and changes nothing — a human racing the idle reclaimer
    /// must not produce an error.
    pub fn clear_takeover(&self, conversation_id: &str) -> bool {
        let mut conversations = self.conversations.write();
        match conversations.get_mut(conversation_id) {
            Some(conv) if conv.taken_over_by_agent => {
                conv.taken_over_by_agent = false;
                conv.agent_assigned_id = None;
                conv.status = ConversationStatus::Open;
                conv.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Refresh `updated_at` (agent activity resets the idle clock).
    pub fn touch(&self, conversation_id: &str) {
        let mut conversations = self.conversations.write();
        if let Some(conv) = conversations.get_mut(conversation_id) {
            conv.updated_at = Utc::now();
        }
    }

    pub fn list(&self) -> Vec<Conversation> {
        self.conversations.read().values().cloned().collect()
    }

    /// All conversations currently flagged as taken over, across tenants.
    /// The idle reclaimer's candidate set.
    pub fn list_taken_over(&self) -> Vec<Conversation> {
        self.conversations
            .read()
            .values()
            .filter(|c| c.taken_over_by_agent)
            .cloned()
            .collect()
    }

    pub fn flush(&self) -> Result<()> {
        let conversations = self.conversations.read();
        write_map(&self.path, &conversations)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn load_map<T: serde::de::DeserializeOwned>(path: &Path) -> Result<HashMap<String, T>> {
    if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    } else {
        Ok(HashMap::new())
    }
}

fn write_map<T: serde::Serialize>(path: &Path, map: &HashMap<String, T>) -> Result<()> {
    let json = serde_json::to_string_pretty(map)
        .map_err(|e| Error::Other(format!("serializing {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(Error::Io)?;
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ConversationContextStore, ConversationStore) {
        let dir = tempfile::tempdir().unwrap();
        let ctxs = ConversationContextStore::new(dir.path()).unwrap();
        let convs = ConversationStore::new(dir.path()).unwrap();
        (dir, ctxs, convs)
    }

    #[test]
    fn get_or_create_returns_existing_on_second_call() {
        let (_dir, ctxs, _) = temp_store();
        let (first, is_new) = ctxs.get_or_create("c1", "u1", "t1");
        assert!(is_new);
        let (second, is_new) = ctxs.get_or_create("c1", "u2", "t1");
        assert!(!is_new);
        // The loser observes the winner's row, not a fresh one.
        assert_eq!(second.user_id, first.user_id);
    }

    #[test]
    fn save_persists_mutations() {
        let (_dir, ctxs, _) = temp_store();
        let (mut ctx, _) = ctxs.get_or_create("c1", "u1", "t1");
        ctx.last_intent = Some("greeting".into());
        ctx.asked_price_count = 2;
        ctxs.save(ctx);

        let loaded = ctxs.get("c1").unwrap();
        assert_eq!(loaded.last_intent.as_deref(), Some("greeting"));
        assert_eq!(loaded.asked_price_count, 2);
    }

    #[test]
    fn flush_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ctxs = ConversationContextStore::new(dir.path()).unwrap();
            ctxs.get_or_create("c1", "u1", "t1");
            ctxs.set_handler("c1", HandlerType::Human);
            ctxs.flush().unwrap();
        }
        let reloaded = ConversationContextStore::new(dir.path()).unwrap();
        assert_eq!(
            reloaded.get("c1").unwrap().handler_type,
            HandlerType::Human
        );
    }

    #[test]
    fn list_human_held_filters_by_handler() {
        let (_dir, ctxs, _) = temp_store();
        ctxs.get_or_create("c1", "u1", "t1");
        ctxs.get_or_create("c2", "u2", "t1");
        ctxs.set_handler("c1", HandlerType::Human);
        let held = ctxs.list_human_held();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].conversation_id, "c1");
    }

    #[test]
    fn clear_takeover_is_idempotent() {
        let (_dir, _, convs) = temp_store();
        convs.get_or_create("c1", "t1");
        convs.set_takeover("c1", "agent-9").unwrap();
        assert!(convs.clear_takeover("c1"));
        // Second release: no-op, no error.
        assert!(!convs.clear_takeover("c1"));
        let conv = convs.get("c1").unwrap();
        assert!(!conv.taken_over_by_agent);
        assert!(conv.agent_assigned_id.is_none());
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[test]
    fn clear_takeover_on_unknown_conversation_is_a_noop() {
        let (_dir, _, convs) = temp_store();
        assert!(!convs.clear_takeover("missing"));
    }

    #[test]
    fn list_taken_over_filters_flagged_only() {
        let (_dir, _, convs) = temp_store();
        convs.get_or_create("c1", "t1");
        convs.get_or_create("c2", "t1");
        convs.set_takeover("c1", "agent-1").unwrap();
        let flagged = convs.list_taken_over();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].conversation_id, "c1");
    }

    #[test]
    fn set_takeover_on_missing_conversation_errors() {
        let (_dir, _, convs) = temp_store();
        assert!(matches!(
            convs.set_takeover("ghost", "agent-1"),
            Err(Error::ConversationNotFound(_))
        ));
    }
}
