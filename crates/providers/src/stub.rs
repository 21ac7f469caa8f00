//! In-process provider that answers with a canned reply.
//!
//! Serves two roles: the `kind = "static"` config option (a fixed reply
//! backend with no network hop), and a controllable double for selector
//! tests via the `set_*` knobs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use sb_domain::config::{BotProviderConfig, BotProviderKind};
use sb_domain::error::{Error, Result};

use crate::traits::{BotMessageRequest, BotProvider, BotResponse, LoadSnapshot};

pub struct StaticBotProvider {
    id: String,
    reply: String,
    max_capacity: u32,
    cost_per_message: f64,
    preference: i32,
    healthy: AtomicBool,
    fail_sends: AtomicBool,
    current_load: AtomicU32,
}

impl StaticBotProvider {
    pub fn from_config(config: &BotProviderConfig) -> Self {
        Self::new(
            &config.id,
            config.static_reply.as_deref().unwrap_or(""),
            config.max_capacity,
            config.cost_per_message,
            config.preference,
        )
    }

    pub fn new(id: &str, reply: &str, max_capacity: u32, cost: f64, preference: i32) -> Self {
        Self {
            id: id.to_owned(),
            reply: reply.to_owned(),
            max_capacity,
            cost_per_message: cost,
            preference,
            healthy: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            current_load: AtomicU32::new(0),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_load(&self, current: u32) {
        self.current_load.store(current, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BotProvider for StaticBotProvider {
    async fn send(&self, _req: &BotMessageRequest) -> Result<BotResponse> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: "send failure injected".into(),
            });
        }
        Ok(BotResponse {
            content: self.reply.clone(),
            provider: self.id.clone(),
            confidence: Some(1.0),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn load(&self) -> LoadSnapshot {
        LoadSnapshot {
            current: self.current_load.load(Ordering::SeqCst),
            max: self.max_capacity,
        }
    }

    fn cost_per_message(&self) -> f64 {
        self.cost_per_message
    }

    fn preference(&self) -> i32 {
        self.preference
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BotProviderKind {
        BotProviderKind::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_with_configured_text() {
        let p = StaticBotProvider::new("greeter", "xin chào", 10, 0.0, 0);
        let resp = p
            .send(&BotMessageRequest {
                bot_id: "b1".into(),
                recipient_id: "u1".into(),
                tenant_id: "t1".into(),
                message: "hi".into(),
                intent: None,
            })
            .await
            .unwrap();
        assert_eq!(resp.content, "xin chào");
        assert_eq!(resp.provider, "greeter");
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_provider_error() {
        let p = StaticBotProvider::new("flaky", "ok", 10, 0.0, 0);
        p.set_fail_sends(true);
        let err = p
            .send(&BotMessageRequest {
                bot_id: "b1".into(),
                recipient_id: "u1".into(),
                tenant_id: "t1".into(),
                message: "hi".into(),
                intent: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
