use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Routing / custom logic
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Intent name that bumps `asked_price_count` on the conversation
    /// context (consumed by rule conditions).
    #[serde(default = "d_price_intent")]
    pub price_intent: String,
    /// Language used for template lookup when the channel does not
    /// provide one.
    #[serde(default = "d_language")]
    pub default_language: String,
    /// Whether keyword triggers match case-sensitively unless the rule
    /// says otherwise.
    #[serde(default)]
    pub keyword_case_sensitive: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            price_intent: d_price_intent(),
            default_language: d_language(),
            keyword_case_sensitive: false,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_price_intent() -> String {
    "ask_price".into()
}
fn d_language() -> String {
    "vi".into()
}
