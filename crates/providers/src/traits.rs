use sb_domain::config::BotProviderKind;
use sb_domain::error::Result;
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A backend-agnostic request to process one inbound message.
#[derive(Debug, Clone)]
pub struct BotMessageRequest {
    /// The tenant's bot this message belongs to.
    pub bot_id: String,
    /// Channel-level recipient (the end user).
    pub recipient_id: String,
    pub tenant_id: String,
    /// Raw message text.
    pub message: String,
    /// Detected intent, when the upstream classifier supplied one.
    pub intent: Option<String>,
}

/// A backend-agnostic bot response.
#[derive(Debug, Clone)]
pub struct BotResponse {
    pub content: String,
    /// The provider that actually produced the response.
    pub provider: String,
    /// Backend-reported confidence in `[0, 1]`, when available.
    pub confidence: Option<f64>,
}

/// Point-in-time load reported by a provider adapter. Never cached
/// beyond a single selection call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoadSnapshot {
    pub current: u32,
    pub max: u32,
}

impl LoadSnapshot {
    /// Load as a fraction of capacity in `[0, 1]`.
    pub fn pct(&self) -> f64 {
        if self.max == 0 {
            1.0
        } else {
            (self.current as f64 / self.max as f64).min(1.0)
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every bot backend adapter must implement.
///
/// Implementations translate between our internal types and the wire
/// format of each automation engine. The selector treats them uniformly;
/// there is no runtime type inspection anywhere in the pipeline.
#[async_trait::async_trait]
pub trait BotProvider: Send + Sync {
    /// Process one message and return the bot's reply.
    async fn send(&self, req: &BotMessageRequest) -> Result<BotResponse>;

    /// Point-in-time health probe. `false` excludes the provider from
    /// selection for this call only.
    async fn health_check(&self) -> bool;

    /// Point-in-time load snapshot.
    fn load(&self) -> LoadSnapshot;

    /// Configured cost per message (arbitrary units, lower preferred).
    fn cost_per_message(&self) -> f64;

    /// Configured preference weight (higher wins ties before cost).
    fn preference(&self) -> i32;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// The adapter kind (for introspection endpoints).
    fn kind(&self) -> BotProviderKind;
}
