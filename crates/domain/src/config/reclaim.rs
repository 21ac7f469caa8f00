use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Idle reclamation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls the sweep that hands abandoned conversations back to the bot.
///
/// Both values are deliberately configurable rather than hard-coded: the
/// right idle threshold is a product decision and varies per deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReclaimConfig {
    /// How often the reclaimer wakes up.
    #[serde(default = "d_30u")]
    pub sweep_interval_secs: u64,
    /// A taken-over conversation idle for at least this long is released
    /// back to the bot.
    #[serde(default = "d_120u")]
    pub idle_threshold_secs: u64,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
            idle_threshold_secs: 120,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_30u() -> u64 {
    30
}
fn d_120u() -> u64 {
    120
}
