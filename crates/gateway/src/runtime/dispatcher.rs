//! Post-decision side effects.
//!
//! Exactly one place performs the effects of a routing decision:
//! outbound delivery toward the channel connector and fan-out to
//! watching agents. `BotProcess` delivers the bot reply and broadcasts
//! both directions; `HumanRequired` broadcasts the user message only
//! (the humans watching are the ones who will answer); `Blocked` does
//! nothing.

use std::sync::Arc;
use std::time::Duration;

use sb_domain::config::ChannelConfig;
use sb_domain::conversation::{MessageSender, TakeoverMessage};
use sb_domain::decision::{Decision, DecisionOutcome};
use sb_domain::error::{Error, Result};
use sb_routing::DecideRequest;

use crate::takeover::TakeoverRegistry;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel delivery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fire-and-forget outbound delivery toward the channel connector.
#[async_trait::async_trait]
pub trait ChannelDelivery: Send + Sync {
    async fn dispatch_send_message(
        &self,
        page_id: &str,
        recipient_id: &str,
        message: &str,
        sender: MessageSender,
    ) -> Result<()>;
}

/// POSTs outbound messages to the configured webhook.
pub struct HttpChannelDelivery {
    client: reqwest::Client,
    webhook_url: String,
}

impl HttpChannelDelivery {
    pub fn new(webhook_url: &str, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url: webhook_url.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl ChannelDelivery for HttpChannelDelivery {
    async fn dispatch_send_message(
        &self,
        page_id: &str,
        recipient_id: &str,
        message: &str,
        sender: MessageSender,
    ) -> Result<()> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({
                "page_id": page_id,
                "recipient_id": recipient_id,
                "message": message,
                "sender": sender,
            }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("channel webhook: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "channel webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Logs and drops outbound messages (dev mode, no webhook configured).
pub struct NoopChannelDelivery;

#[async_trait::async_trait]
impl ChannelDelivery for NoopChannelDelivery {
    async fn dispatch_send_message(
        &self,
        page_id: &str,
        recipient_id: &str,
        message: &str,
        sender: MessageSender,
    ) -> Result<()> {
        tracing::info!(
            page_id,
            recipient_id,
            sender = ?sender,
            message_len = message.len(),
            "outbound delivery dropped (no channel webhook configured)"
        );
        Ok(())
    }
}

/// Pick the delivery backend from config.
pub fn delivery_from_config(config: &ChannelConfig) -> Arc<dyn ChannelDelivery> {
    match &config.webhook_url {
        Some(url) => Arc::new(HttpChannelDelivery::new(url, config.timeout_ms)),
        None => Arc::new(NoopChannelDelivery),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct MessageDispatcher {
    registry: Arc<TakeoverRegistry>,
    delivery: Arc<dyn ChannelDelivery>,
}

impl MessageDispatcher {
    pub fn new(registry: Arc<TakeoverRegistry>, delivery: Arc<dyn ChannelDelivery>) -> Self {
        Self { registry, delivery }
    }

    /// Execute a decision's side effects. Delivery failures are logged,
    /// never propagated: the decision already happened and a webhook
    /// hiccup must not fail the inbound request.
    pub async fn dispatch(&self, req: &DecideRequest, outcome: &DecisionOutcome) {
        if outcome.decision == Decision::Blocked {
            return;
        }

        self.registry.broadcast(
            &req.conversation_id,
            &TakeoverMessage::now(&req.conversation_id, MessageSender::User, &req.message),
        );

        if outcome.decision != Decision::BotProcess {
            return;
        }
        let Some(response) = &outcome.response else {
            return;
        };

        if let Err(e) = self
            .delivery
            .dispatch_send_message(&req.bot_id, &req.user_id, &response.text, MessageSender::Bot)
            .await
        {
            tracing::warn!(
                conversation_id = %req.conversation_id,
                error = %e,
                "outbound delivery failed"
            );
        }

        self.registry.broadcast(
            &req.conversation_id,
            &TakeoverMessage::now(&req.conversation_id, MessageSender::Bot, &response.text),
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use sb_domain::decision::{RenderedResponse, ResponseSource};
    use tokio::sync::mpsc;

    fn request() -> DecideRequest {
        DecideRequest {
            conversation_id: "c1".into(),
            user_id: "u1".into(),
            tenant_id: "t1".into(),
            bot_id: "page-1".into(),
            intent: None,
            message: "hello".into(),
            language: None,
        }
    }

    fn bot_outcome(text: &str) -> DecisionOutcome {
        DecisionOutcome::bot_process(RenderedResponse {
            text: text.into(),
            quick_replies: vec![],
            source: ResponseSource::Provider("p1".into()),
        })
    }

    #[tokio::test]
    async fn bot_process_broadcasts_user_then_bot_message() {
        let registry = Arc::new(TakeoverRegistry::new());
        let (tx, mut rx) = mpsc::channel(8);
        registry.watch("agent-conn", "c1", tx);

        let dispatcher = MessageDispatcher::new(registry, Arc::new(NoopChannelDelivery));
        dispatcher.dispatch(&request(), &bot_outcome("bot reply")).await;

        let first = rx.try_recv().unwrap();
        assert_eq!(first.sender, MessageSender::User);
        assert_eq!(first.content, "hello");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.sender, MessageSender::Bot);
        assert_eq!(second.content, "bot reply");
    }

    #[tokio::test]
    async fn human_required_broadcasts_user_message_only() {
        let registry = Arc::new(TakeoverRegistry::new());
        let (tx, mut rx) = mpsc::channel(8);
        registry.watch("agent-conn", "c1", tx);

        let dispatcher = MessageDispatcher::new(registry, Arc::new(NoopChannelDelivery));
        let outcome = DecisionOutcome::human_required("already assigned to human agent");
        dispatcher.dispatch(&request(), &outcome).await;

        assert_eq!(rx.try_recv().unwrap().sender, MessageSender::User);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn blocked_dispatches_nothing() {
        let registry = Arc::new(TakeoverRegistry::new());
        let (tx, mut rx) = mpsc::channel(8);
        registry.watch("agent-conn", "c1", tx);

        let dispatcher = MessageDispatcher::new(registry, Arc::new(NoopChannelDelivery));
        dispatcher
            .dispatch(&request(), &DecisionOutcome::blocked("sender is blocked"))
            .await;

        assert!(rx.try_recv().is_err());
    }
}
