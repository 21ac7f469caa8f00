use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bot provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotProvidersConfig {
    /// Timeout applied to every provider send. A timed-out call is
    /// treated like any other provider failure.
    #[serde(default = "d_10000u")]
    pub default_timeout_ms: u64,
    /// Registered bot provider backends (data-driven: adding a backend =
    /// adding config).
    #[serde(default)]
    pub providers: Vec<BotProviderConfig>,
}

impl Default for BotProvidersConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            providers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotProviderConfig {
    pub id: String,
    pub kind: BotProviderKind,
    /// Base URL of the backend (required for `http` providers).
    #[serde(default)]
    pub base_url: String,
    /// Env var containing the backend API key, if the backend needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Concurrent in-flight message capacity used for load snapshots.
    #[serde(default = "d_50u")]
    pub max_capacity: u32,
    /// Cost per message in arbitrary units. Lower is preferred when load
    /// is equal.
    #[serde(default)]
    pub cost_per_message: f64,
    /// Tenant-configured preference: higher wins ties before cost.
    #[serde(default)]
    pub preference: i32,
    /// Canned reply for `static` providers (dev/test backends).
    #[serde(default)]
    pub static_reply: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotProviderKind {
    /// Remote automation engine spoken to over HTTP.
    Http,
    /// In-process canned-reply backend for development and tests.
    Static,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_10000u() -> u64 {
    10_000
}
fn d_50u() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_config_defaults() {
        let cfg = BotProvidersConfig::default();
        assert_eq!(cfg.default_timeout_ms, 10_000);
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn provider_config_parses_minimal_http() {
        let toml_str = r#"
            id = "dialog-engine"
            kind = "http"
            base_url = "http://localhost:9000"
        "#;
        let cfg: BotProviderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.id, "dialog-engine");
        assert_eq!(cfg.kind, BotProviderKind::Http);
        assert_eq!(cfg.max_capacity, 50);
        assert_eq!(cfg.preference, 0);
    }

    #[test]
    fn provider_config_parses_static_with_reply() {
        let toml_str = r#"
            id = "canned"
            kind = "static"
            static_reply = "I am a bot"
            preference = 5
        "#;
        let cfg: BotProviderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.kind, BotProviderKind::Static);
        assert_eq!(cfg.static_reply.as_deref(), Some("I am a bot"));
        assert_eq!(cfg.preference, 5);
    }
}
