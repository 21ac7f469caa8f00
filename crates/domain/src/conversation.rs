//! Conversation model: per-conversation routing state, the persisted
//! conversation aggregate flags, and the transient takeover broadcast
//! message.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Who currently owns a conversation. State only changes via explicit
/// takeover/release or idle reclamation, never by message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    #[default]
    Bot,
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Open,
    Closed,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-conversation routing state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Routing state for one conversation. Created on the first inbound
/// message, mutated on every decision, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default)]
    pub handler_type: HandlerType,
    #[serde(default)]
    pub last_intent: Option<String>,
    /// Counter consumed by rule conditions (e.g. "asked price 3 times").
    #[serde(default)]
    pub asked_price_count: u32,
    /// Free-form metadata used for template variable interpolation
    /// (`{{user_name}}` and friends).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    /// Fresh context for a brand-new conversation (bot-handled by default).
    pub fn new(conversation_id: &str, user_id: &str, tenant_id: &str) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            user_id: user_id.to_owned(),
            handler_type: HandlerType::Bot,
            last_intent: None,
            asked_price_count: 0,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_human_held(&self) -> bool {
        self.handler_type == HandlerType::Human
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation aggregate flags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The slice of the conversation aggregate the routing core reads and
/// writes. Invariant: `taken_over_by_agent == true` iff the paired
/// [`ConversationContext::handler_type`] is [`HandlerType::Human`];
/// takeover/release/reclaim keep the two in sync under the
/// per-conversation lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default)]
    pub taken_over_by_agent: bool,
    #[serde(default)]
    pub agent_assigned_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(conversation_id: &str, tenant_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            status: ConversationStatus::Open,
            taken_over_by_agent: false,
            agent_assigned_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Seconds since the last update (used by the idle reclaimer).
    pub fn idle_secs(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.updated_at).num_seconds()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Takeover broadcast message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Originator of a message flowing through a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Bot,
    Agent,
}

/// Transient value broadcast to every agent connection watching a
/// conversation. Not persisted by the routing core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeoverMessage {
    pub conversation_id: String,
    pub sender: MessageSender,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl TakeoverMessage {
    pub fn now(conversation_id: &str, sender: MessageSender, content: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_owned(),
            sender,
            content: content.to_owned(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
