use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State directory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the gateway keeps its JSON state files (conversation contexts,
/// conversation flags, rules, templates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "d_state_path")]
    pub path: PathBuf,
    /// Interval for the periodic store flush loop.
    #[serde(default = "d_30u")]
    pub flush_interval_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: d_state_path(),
            flush_interval_secs: 30,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_state_path() -> PathBuf {
    PathBuf::from("./data/state")
}
fn d_30u() -> u64 {
    30
}
