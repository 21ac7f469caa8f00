//! Takeover and release transitions.
//!
//! The one place the BOT↔HUMAN state machine changes hands. Both the
//! API handlers and the idle reclaimer go through these operations, so
//! the flag/handler sync invariant (`taken_over_by_agent == true` iff
//! context handler is Human) holds no matter who initiated the
//! transition. Each transition runs under the per-conversation lock.

use std::sync::Arc;

use sb_context::{ConversationContextStore, ConversationLockMap, ConversationStore};
use sb_domain::conversation::{Conversation, HandlerType};
use sb_domain::error::{Error, Result};
use sb_domain::trace::TraceEvent;

pub struct HandoffOps {
    locks: Arc<ConversationLockMap>,
    conversations: Arc<ConversationStore>,
    contexts: Arc<ConversationContextStore>,
}

impl HandoffOps {
    pub fn new(
        locks: Arc<ConversationLockMap>,
        conversations: Arc<ConversationStore>,
        contexts: Arc<ConversationContextStore>,
    ) -> Self {
        Self {
            locks,
            conversations,
            contexts,
        }
    }

    /// Assign a conversation to a human agent, silencing the bot.
    pub async fn takeover(&self, conversation_id: &str, agent_id: &str) -> Result<Conversation> {
        let _permit = self.locks.acquire(conversation_id).await?;

        // The context is created by the first inbound message; taking
        // over a conversation that never had one is a caller error.
        let ctx = self
            .contexts
            .get(conversation_id)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_owned()))?;

        self.conversations
            .get_or_create(conversation_id, &ctx.tenant_id);
        let conv = self.conversations.set_takeover(conversation_id, agent_id)?;
        self.contexts.set_handler(conversation_id, HandlerType::Human);

        TraceEvent::TakeoverStarted {
            conversation_id: conversation_id.to_owned(),
            agent_id: agent_id.to_owned(),
        }
        .emit();

        Ok(conv)
    }

    /// Hand a conversation back to the bot. Idempotent: releasing an
    /// already-released (or unknown) conversation succeeds with
    /// `was_taken_over = false` — a human racing the idle reclaimer must
    /// not see an error.
    pub async fn release(&self, conversation_id: &str, reason: &str) -> Result<bool> {
        let _permit = self.locks.acquire(conversation_id).await?;

        let was_taken_over = self.conversations.clear_takeover(conversation_id);
        self.contexts.set_handler(conversation_id, HandlerType::Bot);

        TraceEvent::ConversationReleased {
            conversation_id: conversation_id.to_owned(),
            reason: reason.to_owned(),
            was_taken_over,
        }
        .emit();

        Ok(was_taken_over)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
