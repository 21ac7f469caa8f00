//! The routing decision engine.
//!
//! One `decide` call per inbound message. The handler state machine is
//! deliberately small: {Bot, Human} per conversation, changed only by
//! explicit takeover/release or idle reclamation, never by message
//! content.

use std::sync::Arc;
use std::time::Instant;

use sb_context::{with_tenant, ConversationContextStore};
use sb_domain::config::RoutingConfig;
use sb_domain::conversation::ConversationContext;
use sb_domain::decision::{Decision, DecisionOutcome, RenderedResponse, ResponseSource};
use sb_domain::error::Result;
use sb_domain::trace::TraceEvent;
use sb_providers::{BotMessageRequest, ProviderSelector};

use crate::custom_logic::CustomLogicEngine;

/// One inbound message, as the ingestion surface hands it over. Intent
/// detection happens upstream; `intent` is `None` when the classifier
/// had nothing.
#[derive(Debug, Clone)]
pub struct DecideRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub bot_id: String,
    pub intent: Option<String>,
    pub message: String,
    pub language: Option<String>,
}

pub struct DecisionEngine {
    contexts: Arc<ConversationContextStore>,
    custom_logic: CustomLogicEngine,
    selector: Arc<ProviderSelector>,
    routing: RoutingConfig,
}

impl DecisionEngine {
    pub fn new(
        contexts: Arc<ConversationContextStore>,
        custom_logic: CustomLogicEngine,
        selector: Arc<ProviderSelector>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            contexts,
            custom_logic,
            selector,
            routing,
        }
    }

    /// Route one inbound message. Runs the whole evaluation inside the
    /// request's tenant scope.
    ///
    /// Safety invariant: while the context's handler is Human, this
    /// never returns [`Decision::BotProcess`]. Provider failures degrade
    /// to `HumanRequired` instead of propagating; a user message is
    /// never silently dropped.
    pub async fn decide(&self, req: DecideRequest) -> Result<DecisionOutcome> {
        let tenant_id = req.tenant_id.clone();
        with_tenant(&tenant_id, self.decide_scoped(req)).await
    }

    async fn decide_scoped(&self, req: DecideRequest) -> Result<DecisionOutcome> {
        let started = Instant::now();
        let (ctx, _is_new) =
            self.contexts
                .get_or_create(&req.conversation_id, &req.user_id, &req.tenant_id);

        let outcome = self.evaluate(&req, &ctx).await?;

        if outcome.should_update_context {
            let mut updated = ctx;
            if outcome.decision == Decision::BotProcess {
                updated.last_intent = req.intent.clone();
                if req.intent.as_deref() == Some(self.routing.price_intent.as_str()) {
                    updated.asked_price_count += 1;
                }
            }
            self.contexts.save(updated);
        }

        TraceEvent::DecisionMade {
            conversation_id: req.conversation_id.clone(),
            decision: match outcome.decision {
                Decision::BotProcess => "bot_process".into(),
                Decision::HumanRequired => "human_required".into(),
                Decision::Blocked => "blocked".into(),
            },
            reason: outcome.reason.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(outcome)
    }

    async fn evaluate(
        &self,
        req: &DecideRequest,
        ctx: &ConversationContext,
    ) -> Result<DecisionOutcome> {
        // An agent holds the conversation: the bot pipeline is never
        // invoked in this state.
        if ctx.is_human_held() {
            return Ok(DecisionOutcome::human_required(
                "already assigned to human agent",
            ));
        }

        // Tenants can hard-block a sender via context metadata; a
        // blocked message must not advance conversation state.
        if ctx.metadata.get("blocked").map(String::as_str) == Some("true") {
            return Ok(DecisionOutcome::blocked("sender is blocked"));
        }

        // Custom logic first; evaluation failures fall through to the
        // provider path rather than failing the message.
        let language = req
            .language
            .clone()
            .unwrap_or_else(|| self.routing.default_language.clone());
        match self.custom_logic.evaluate(
            &req.bot_id,
            req.intent.as_deref(),
            &language,
            &req.message,
            ctx,
        ) {
            Ok(Some(rendered)) => return Ok(DecisionOutcome::bot_process(rendered)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    conversation_id = %req.conversation_id,
                    error = %e,
                    "custom logic evaluation failed, falling through to provider"
                );
            }
        }

        // Generic provider path with selection + fallback.
        let provider_req = BotMessageRequest {
            bot_id: req.bot_id.clone(),
            recipient_id: req.user_id.clone(),
            tenant_id: req.tenant_id.clone(),
            message: req.message.clone(),
            intent: req.intent.clone(),
        };
        match self.selector.invoke(&provider_req).await {
            Ok(resp) => Ok(DecisionOutcome::bot_process(RenderedResponse {
                text: resp.content,
                quick_replies: Vec::new(),
                source: ResponseSource::Provider(resp.provider),
            })),
            // Provider-side failures hand the message to a human rather
            // than dropping it; anything else is a real error.
            Err(e) if e.degrades_to_human() => {
                Ok(DecisionOutcome::human_required(format!("internal error: {e}")))
            }
            Err(e) => Err(e),
        }
    }
}
