//! Provider instantiation from config.

use std::collections::HashMap;
use std::sync::Arc;

use sb_domain::config::{BotProviderKind, BotProvidersConfig};

use crate::http::HttpBotProvider;
use crate::stub::StaticBotProvider;
use crate::traits::BotProvider;

/// Holds every configured provider adapter, keyed by id.
///
/// Construction is best-effort: a provider that fails to initialise
/// (usually a missing API key env var) is logged and skipped so one bad
/// entry does not take the whole service down.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn BotProvider>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &BotProvidersConfig) -> Self {
        let mut providers: HashMap<String, Arc<dyn BotProvider>> = HashMap::new();

        for pc in &config.providers {
            let built: Option<Arc<dyn BotProvider>> = match pc.kind {
                BotProviderKind::Http => match HttpBotProvider::from_config(pc) {
                    Ok(p) => Some(Arc::new(p)),
                    Err(e) => {
                        tracing::warn!(provider = %pc.id, error = %e, "skipping provider");
                        None
                    }
                },
                BotProviderKind::Static => Some(Arc::new(StaticBotProvider::from_config(pc))),
            };

            if let Some(provider) = built {
                if providers.insert(pc.id.clone(), provider).is_some() {
                    tracing::warn!(provider = %pc.id, "duplicate provider id, keeping last");
                }
            }
        }

        tracing::info!(count = providers.len(), "provider registry initialised");
        Self { providers }
    }

    /// Build a registry directly from adapter instances (tests).
    pub fn from_providers(providers: Vec<Arc<dyn BotProvider>>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.provider_id().to_owned(), p))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn BotProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn BotProvider>> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider ids, sorted for stable output.
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_domain::config::BotProviderConfig;

    fn static_config(id: &str) -> BotProviderConfig {
        BotProviderConfig {
            id: id.into(),
            kind: BotProviderKind::Static,
            base_url: String::new(),
            api_key_env: None,
            max_capacity: 10,
            cost_per_message: 0.0,
            preference: 0,
            static_reply: Some("ok".into()),
        }
    }

    #[test]
    fn builds_static_providers_from_config() {
        let config = BotProvidersConfig {
            default_timeout_ms: 10_000,
            providers: vec![static_config("a"), static_config("b")],
        };
        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list_providers(), vec!["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn missing_api_key_env_skips_provider() {
        let config = BotProvidersConfig {
            default_timeout_ms: 10_000,
            providers: vec![BotProviderConfig {
                id: "remote".into(),
                kind: BotProviderKind::Http,
                base_url: "http://localhost:9999".into(),
                api_key_env: Some("SB_TEST_DEFINITELY_UNSET_KEY".into()),
                max_capacity: 10,
                cost_per_message: 0.0,
                preference: 0,
                static_reply: None,
            }],
        };
        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.is_empty());
    }
}
