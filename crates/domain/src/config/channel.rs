use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound channel delivery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where decided responses are delivered. Unset `webhook_url` means
/// outbound delivery is logged and dropped (dev mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel connector endpoint; messages are POSTed there as JSON.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Request timeout for webhook calls.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: d_timeout_ms(),
        }
    }
}

fn d_timeout_ms() -> u64 {
    5_000
}
