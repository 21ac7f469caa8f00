mod channel;
mod observability;
mod providers;
mod reclaim;
mod routing;
mod server;
mod state;

pub use channel::*;
pub use observability::*;
pub use providers::*;
pub use reclaim::*;
pub use routing::*;
pub use server::*;
pub use state::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub bots: BotProvidersConfig,
    #[serde(default)]
    pub reclaim: ReclaimConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.bots.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "bots.providers".into(),
                message: "no bot providers configured — every message will be \
                          handed to a human"
                    .into(),
            });
        }

        for (i, provider) in self.bots.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("bots.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.kind == BotProviderKind::Http && provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("bots.providers[{i}].base_url"),
                    message: "http providers require a base_url".into(),
                });
            }
            if provider.max_capacity == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("bots.providers[{i}].max_capacity"),
                    message: "max_capacity must be greater than 0".into(),
                });
            }
        }

        if self.reclaim.sweep_interval_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "reclaim.sweep_interval_secs".into(),
                message: "sweep interval must be greater than 0".into(),
            });
        }
        if self.reclaim.idle_threshold_secs < self.reclaim.sweep_interval_secs {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "reclaim.idle_threshold_secs".into(),
                message: "idle threshold is shorter than the sweep interval — \
                          agents may be released almost immediately"
                    .into(),
            });
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_with_provider_warning_only() {
        let config = Config::default();
        let issues = config.validate();
        assert!(issues
            .iter()
            .all(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut config = Config::default();
        config.server.port = 0;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "server.port"));
    }

    #[test]
    fn http_provider_without_base_url_is_an_error() {
        let toml_str = r#"
            [[bots.providers]]
            id = "dialog-engine"
            kind = "http"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "bots.providers[0].base_url"));
    }
}
