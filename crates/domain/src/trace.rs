use serde::Serialize;

/// Structured trace events emitted across all Switchboard crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ContextResolved {
        conversation_id: String,
        tenant_id: String,
        is_new: bool,
    },
    DecisionMade {
        conversation_id: String,
        decision: String,
        reason: Option<String>,
        duration_ms: u64,
    },
    RuleMatched {
        rule_id: String,
        bot_id: String,
        trigger: String,
        priority: i32,
    },
    TemplateRendered {
        template_id: String,
        intent: String,
        language: String,
    },
    ProviderSelected {
        provider: String,
        fallbacks: usize,
        confidence: f64,
    },
    ProviderFallback {
        from_provider: String,
        to_provider: String,
        reason: String,
    },
    TakeoverStarted {
        conversation_id: String,
        agent_id: String,
    },
    ConversationReleased {
        conversation_id: String,
        reason: String,
        was_taken_over: bool,
    },
    WatchStarted {
        connection_id: String,
        conversation_id: String,
        moved_from: Option<String>,
    },
    WatchEnded {
        connection_id: String,
        conversation_id: String,
    },
    BroadcastFanOut {
        conversation_id: String,
        watchers: usize,
        skipped_closed: usize,
    },
    IdleSweepCompleted {
        candidates: usize,
        released: usize,
        failed: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sb_event");
    }
}
