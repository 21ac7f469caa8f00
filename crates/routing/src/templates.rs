//! Response templates keyed by `(intent, language)`.

use serde::{Deserialize, Serialize};

/// Generic phrasing for an intent in one language. Only consulted when
/// no rule matched; highest `priority` wins, ties to the most recently
/// created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTemplate {
    pub id: String,
    pub tenant_id: String,
    pub bot_id: String,
    pub intent: String,
    pub language: String,
    /// Body with `{{var}}` placeholders.
    pub body: String,
    #[serde(default)]
    pub quick_replies: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "d_active")]
    pub is_active: bool,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub created_seq: u64,
}

fn d_active() -> bool {
    true
}

impl ResponseTemplate {
    pub fn matches(&self, intent: &str, language: &str) -> bool {
        self.intent == intent && self.language == language
    }
}
