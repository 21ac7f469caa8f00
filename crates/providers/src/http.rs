//! HTTP adapter for remote automation engines.
//!
//! Wire format (engine side):
//! - `POST {base_url}/v1/messages` with `{bot_id, recipient_id, message, intent}`
//!   returns `{"content": "...", "confidence": 0.92}`
//! - `GET {base_url}/health` returns 2xx when the engine can take traffic.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use sb_domain::config::{BotProviderConfig, BotProviderKind};
use sb_domain::error::{Error, Result};

use crate::traits::{BotMessageRequest, BotProvider, BotResponse, LoadSnapshot};

pub struct HttpBotProvider {
    id: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    max_capacity: u32,
    cost_per_message: f64,
    preference: i32,
    in_flight: Arc<AtomicU32>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: String,
    #[serde(default)]
    confidence: Option<f64>,
}

impl HttpBotProvider {
    /// Build the adapter from config. The API key env var (if any) is
    /// resolved eagerly so a missing credential fails at startup, not on
    /// the first message.
    pub fn from_config(config: &BotProviderConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(env_var) => {
                let key = std::env::var(env_var).map_err(|_| {
                    Error::Config(format!(
                        "provider '{}': env var {env_var} is not set",
                        config.id
                    ))
                })?;
                Some(key)
            }
            None => None,
        };

        Ok(Self {
            id: config.id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            client: reqwest::Client::new(),
            max_capacity: config.max_capacity,
            cost_per_message: config.cost_per_message,
            preference: config.preference,
            in_flight: Arc::new(AtomicU32::new(0)),
        })
    }
}

/// Decrements the in-flight counter when a send completes (or fails).
struct InFlightGuard(Arc<AtomicU32>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BotProvider for HttpBotProvider {
    async fn send(&self, req: &BotMessageRequest) -> Result<BotResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard(self.in_flight.clone());

        let url = format!("{}/v1/messages", self.base_url);
        let mut request = self.client.post(&url).json(&serde_json::json!({
            "bot_id": req.bot_id,
            "recipient_id": req.recipient_id,
            "message": req.message,
            "intent": req.intent,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("{}: {e}", self.id)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let wire: WireResponse = response.json().await.map_err(|e| Error::Provider {
            provider: self.id.clone(),
            message: format!("invalid response body: {e}"),
        })?;

        Ok(BotResponse {
            content: wire.content,
            provider: self.id.clone(),
            confidence: wire.confidence,
        })
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(provider = %self.id, error = %e, "health check failed");
                false
            }
        }
    }

    fn load(&self) -> LoadSnapshot {
        LoadSnapshot {
            current: self.in_flight.load(Ordering::SeqCst),
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
        BotProviderKind::Http
    }
}
