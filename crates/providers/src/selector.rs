//! Health- and load-aware provider selection with ordered fallback.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use sb_domain::error::{Error, Result};
use sb_domain::trace::TraceEvent;

use crate::registry::ProviderRegistry;
use crate::traits::{BotMessageRequest, BotProvider, BotResponse, LoadSnapshot};

/// Per-provider observation captured during one selection pass.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSnapshot {
    pub id: String,
    pub healthy: bool,
    pub load: LoadSnapshot,
}

/// The result of one selection pass: a primary (when any provider is
/// healthy), the remaining healthy providers in fallback order, and the
/// snapshots the decision was based on.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSelection {
    pub provider: Option<String>,
    pub fallbacks: Vec<String>,
    pub confidence: f64,
    pub snapshots: Vec<ProviderSnapshot>,
}

pub struct ProviderSelector {
    registry: Arc<ProviderRegistry>,
    timeout: Duration,
}

impl ProviderSelector {
    pub fn new(registry: Arc<ProviderRegistry>, timeout_ms: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Probe every provider and rank the healthy ones.
    ///
    /// Ordering: least loaded first, then higher preference, then lower
    /// cost. Health and load are read once per call; results are never
    /// cached across calls.
    pub async fn select(&self) -> ProviderSelection {
        let mut ranked: Vec<(Arc<dyn BotProvider>, LoadSnapshot)> = Vec::new();
        let mut snapshots = Vec::new();

        for provider in self.registry.iter() {
            let healthy = provider.health_check().await;
            let load = provider.load();
            snapshots.push(ProviderSnapshot {
                id: provider.provider_id().to_owned(),
                healthy,
                load,
            });
            if healthy {
                ranked.push((provider.clone(), load));
            }
        }

        ranked.sort_by(|(a, la), (b, lb)| {
            la.pct()
                .total_cmp(&lb.pct())
                .then_with(|| b.preference().cmp(&a.preference()))
                .then_with(|| a.cost_per_message().total_cmp(&b.cost_per_message()))
        });

        let mut ids = ranked
            .iter()
            .map(|(p, _)| p.provider_id().to_owned())
            .collect::<Vec<_>>();

        let selection = if ids.is_empty() {
            ProviderSelection {
                provider: None,
                fallbacks: Vec::new(),
                confidence: 0.0,
                snapshots,
            }
        } else {
            let primary = ids.remove(0);
            let confidence = 1.0 - ranked[0].1.pct();
            ProviderSelection {
                provider: Some(primary),
                fallbacks: ids,
                confidence,
                snapshots,
            }
        };

        if let Some(primary) = &selection.provider {
            TraceEvent::ProviderSelected {
                provider: primary.clone(),
                fallbacks: selection.fallbacks.len(),
                confidence: selection.confidence,
            }
            .emit();
        }

        selection
    }

    /// Select and invoke, walking the fallback chain on failure.
    ///
    /// Each attempt runs under the configured timeout; a timed-out call
    /// counts as a failure for that provider. When every candidate fails
    /// (or none is healthy) the caller gets `ProviderUnavailable` and is
    /// expected to degrade to a human handler.
    pub async fn invoke(&self, req: &BotMessageRequest) -> Result<BotResponse> {
        let selection = self.select().await;

        let Some(primary) = selection.provider.clone() else {
            return Err(Error::ProviderUnavailable(
                "no healthy bot provider available".into(),
            ));
        };

        let mut chain = vec![primary];
        chain.extend(selection.fallbacks.iter().cloned());

        let mut last_error: Option<Error> = None;
        for (i, id) in chain.iter().enumerate() {
            let Some(provider) = self.registry.get(id) else {
                continue;
            };

            let attempt = tokio::time::timeout(self.timeout, provider.send(req)).await;
            let result = match attempt {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout(format!(
                    "provider {id} timed out after {}ms",
                    self.timeout.as_millis()
                ))),
            };

            match result {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    tracing::warn!(provider = %id, error = %e, "provider attempt failed");
                    if let Some(next) = chain.get(i + 1) {
                        TraceEvent::ProviderFallback {
                            from_provider: id.clone(),
                            to_provider: next.clone(),
                            reason: e.to_string(),
                        }
                        .emit();
                    }
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no provider attempt completed".into());
        Err(Error::ProviderUnavailable(format!(
            "all bot providers failed: {detail}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StaticBotProvider;

    fn request() -> BotMessageRequest {
        BotMessageRequest {
            bot_id: "b1".into(),
            recipient_id: "u1".into(),
            tenant_id: "t1".into(),
            message: "hello".into(),
            intent: None,
        }
    }

    fn selector(providers: Vec<Arc<StaticBotProvider>>) -> ProviderSelector {
        let dyns: Vec<Arc<dyn BotProvider>> = providers
            .into_iter()
            .map(|p| p as Arc<dyn BotProvider>)
            .collect();
        ProviderSelector::new(Arc::new(ProviderRegistry::from_providers(dyns)), 1_000)
    }

    #[tokio::test]
    async fn least_loaded_provider_wins() {
        let busy = Arc::new(StaticBotProvider::new("busy", "a", 10, 0.0, 0));
        busy.set_load(8);
        let idle = Arc::new(StaticBotProvider::new("idle", "b", 10, 0.0, 0));
        idle.set_load(1);

        let sel = selector(vec![busy, idle]).select().await;
        assert_eq!(sel.provider.as_deref(), Some("idle"));
        assert_eq!(sel.fallbacks, vec!["busy"]);
    }

    #[tokio::test]
    async fn preference_breaks_load_ties() {
        let low = Arc::new(StaticBotProvider::new("low", "a", 10, 0.0, 1));
        let high = Arc::new(StaticBotProvider::new("high", "b", 10, 0.0, 5));

        let sel = selector(vec![low, high]).select().await;
        assert_eq!(sel.provider.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn cost_breaks_remaining_ties() {
        let cheap = Arc::new(StaticBotProvider::new("cheap", "a", 10, 0.01, 0));
        let pricey = Arc::new(StaticBotProvider::new("pricey", "b", 10, 0.20, 0));

        let sel = selector(vec![pricey, cheap]).select().await;
        assert_eq!(sel.provider.as_deref(), Some("cheap"));
    }

    #[tokio::test]
    async fn unhealthy_provider_is_never_selected() {
        let down = Arc::new(StaticBotProvider::new("down", "a", 10, 0.0, 9));
        down.set_healthy(false);
        let up = Arc::new(StaticBotProvider::new("up", "b", 10, 0.0, 0));

        let sel = selector(vec![down, up]).select().await;
        assert_eq!(sel.provider.as_deref(), Some("up"));
        assert!(sel.fallbacks.is_empty());
        let down_snap = sel.snapshots.iter().find(|s| s.id == "down").unwrap();
        assert!(!down_snap.healthy);
    }

    #[tokio::test]
    async fn no_healthy_provider_yields_none() {
        let a = Arc::new(StaticBotProvider::new("a", "x", 10, 0.0, 0));
        a.set_healthy(false);

        let sel = selector(vec![a]).select().await;
        assert!(sel.provider.is_none());
        assert_eq!(sel.confidence, 0.0);
    }

    #[tokio::test]
    async fn invoke_falls_back_when_primary_fails() {
        let primary = Arc::new(StaticBotProvider::new("primary", "first", 10, 0.0, 5));
        primary.set_fail_sends(true);
        let backup = Arc::new(StaticBotProvider::new("backup", "second", 10, 0.0, 0));

        let resp = selector(vec![primary, backup])
            .invoke(&request())
            .await
            .unwrap();
        assert_eq!(resp.provider, "backup");
        assert_eq!(resp.content, "second");
    }

    #[tokio::test]
    async fn invoke_with_no_healthy_providers_errors() {
        let a = Arc::new(StaticBotProvider::new("a", "x", 10, 0.0, 0));
        a.set_healthy(false);

        let err = selector(vec![a]).invoke(&request()).await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn invoke_when_all_attempts_fail_errors() {
        let a = Arc::new(StaticBotProvider::new("a", "x", 10, 0.0, 0));
        a.set_fail_sends(true);
        let b = Arc::new(StaticBotProvider::new("b", "y", 10, 0.0, 0));
        b.set_fail_sends(true);

        let err = selector(vec![a, b]).invoke(&request()).await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }
}
