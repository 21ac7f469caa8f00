//! Tenant-authored routing rules.

use serde::{Deserialize, Serialize};

use sb_domain::config::RoutingConfig;
use sb_domain::conversation::ConversationContext;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Triggers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a rule matches on. One variant per trigger kind, matched
/// exhaustively; no string-typed dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleTrigger {
    /// Exact match against the detected intent.
    Intent(String),
    /// Substring match against the raw message. `case_sensitive` falls
    /// back to the routing config when unset.
    Keyword {
        value: String,
        #[serde(default)]
        case_sensitive: Option<bool>,
    },
    /// Regex match against the raw message. An invalid pattern never
    /// matches; it is logged once per evaluation.
    Regex(String),
    /// Matches every message.
    Always,
    /// Predicate over the conversation context.
    Condition(ContextPredicate),
}

/// Closed predicate set over context fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ContextPredicate {
    AskedPriceAtLeast { count: u32 },
    LastIntentIs { intent: String },
    MetadataEquals { key: String, value: String },
}

impl ContextPredicate {
    pub fn eval(&self, ctx: &ConversationContext) -> bool {
        match self {
            Self::AskedPriceAtLeast { count } => ctx.asked_price_count >= *count,
            Self::LastIntentIs { intent } => ctx.last_intent.as_deref() == Some(intent.as_str()),
            Self::MetadataEquals { key, value } => {
                ctx.metadata.get(key).map(String::as_str) == Some(value.as_str())
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rule
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A tenant-scoped override rule. Rules beat templates regardless of
/// numeric priority; among rules, highest `priority` wins and ties go to
/// the most recently created (`created_seq`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRule {
    pub id: String,
    pub tenant_id: String,
    pub bot_id: String,
    pub trigger: RuleTrigger,
    /// Response body, interpolated against context metadata.
    pub response: String,
    #[serde(default)]
    pub quick_replies: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "d_active")]
    pub is_active: bool,
    #[serde(default)]
    pub execution_count: u64,
    /// Monotonic creation sequence assigned by the store.
    #[serde(default)]
    pub created_seq: u64,
}

fn d_active() -> bool {
    true
}

impl BotRule {
    /// Does this rule's trigger match the inbound message?
    pub fn matches(
        &self,
        intent: Option<&str>,
        message: &str,
        ctx: &ConversationContext,
        routing: &RoutingConfig,
    ) -> bool {
        match &self.trigger {
            RuleTrigger::Intent(want) => intent == Some(want.as_str()),
            RuleTrigger::Keyword {
                value,
                case_sensitive,
            } => {
                let sensitive = case_sensitive.unwrap_or(routing.keyword_case_sensitive);
                if sensitive {
                    message.contains(value.as_str())
                } else {
                    message.to_lowercase().contains(&value.to_lowercase())
                }
            }
            RuleTrigger::Regex(pattern) => match regex::Regex::new(pattern) {
                Ok(re) => re.is_match(message),
                Err(e) => {
                    tracing::warn!(rule_id = %self.id, error = %e, "invalid rule regex");
                    false
                }
            },
            RuleTrigger::Always => true,
            RuleTrigger::Condition(pred) => pred.eval(ctx),
        }
    }

    /// Short label for trace events.
    pub fn trigger_kind(&self) -> &'static str {
        match &self.trigger {
            RuleTrigger::Intent(_) => "intent",
            RuleTrigger::Keyword { .. } => "keyword",
            RuleTrigger::Regex(_) => "regex",
            RuleTrigger::Always => "always",
            RuleTrigger::Condition(_) => "condition",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
