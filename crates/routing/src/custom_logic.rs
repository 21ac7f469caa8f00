//! Rule + template evaluation.

use std::sync::Arc;

use sb_context::current_tenant;
use sb_domain::config::RoutingConfig;
use sb_domain::conversation::ConversationContext;
use sb_domain::decision::{RenderedResponse, ResponseSource};
use sb_domain::error::Result;
use sb_domain::trace::TraceEvent;

use crate::interpolate::interpolate;
use crate::store::CustomLogicStore;

/// Evaluates the tenant's custom logic for one inbound message.
///
/// Rules win over templates regardless of numeric priority; within each
/// layer the highest priority wins and ties break toward the most
/// recently created entry. `Ok(None)` means "no custom logic" and the
/// caller falls through to the generic provider path.
pub struct CustomLogicEngine {
    store: Arc<CustomLogicStore>,
    routing: RoutingConfig,
}

impl CustomLogicEngine {
    pub fn new(store: Arc<CustomLogicStore>, routing: RoutingConfig) -> Self {
        Self { store, routing }
    }

    pub fn store(&self) -> &Arc<CustomLogicStore> {
        &self.store
    }

    /// Tenant comes from the ambient scope, not a parameter; calling
    /// outside a tenant scope is a programming error.
    pub fn evaluate(
        &self,
        bot_id: &str,
        intent: Option<&str>,
        language: &str,
        message: &str,
        ctx: &ConversationContext,
    ) -> Result<Option<RenderedResponse>> {
        let tenant_id = current_tenant()?;

        if let Some(rendered) = self.evaluate_rules(&tenant_id, bot_id, intent, message, ctx) {
            return Ok(Some(rendered));
        }
        if let Some(intent) = intent {
            if let Some(rendered) =
                self.evaluate_templates(&tenant_id, bot_id, intent, language, ctx)
            {
                return Ok(Some(rendered));
            }
        }
        Ok(None)
    }

    fn evaluate_rules(
        &self,
        tenant_id: &str,
        bot_id: &str,
        intent: Option<&str>,
        message: &str,
        ctx: &ConversationContext,
    ) -> Option<RenderedResponse> {
        let best = self
            .store
            .rules_for(tenant_id, bot_id)
            .into_iter()
            .filter(|r| r.matches(intent, message, ctx, &self.routing))
            .max_by_key(|r| (r.priority, r.created_seq))?;

        self.store.record_rule_execution(&best.id);
        TraceEvent::RuleMatched {
            rule_id: best.id.clone(),
            bot_id: bot_id.to_owned(),
            trigger: best.trigger_kind().to_owned(),
            priority: best.priority,
        }
        .emit();

        Some(RenderedResponse {
            text: interpolate(&best.response, ctx),
            quick_replies: best.quick_replies.clone(),
            source: ResponseSource::Rule(best.id),
        })
    }

    fn evaluate_templates(
        &self,
        tenant_id: &str,
        bot_id: &str,
        intent: &str,
        language: &str,
        ctx: &ConversationContext,
    ) -> Option<RenderedResponse> {
        let best = self
            .store
            .templates_for(tenant_id, bot_id)
            .into_iter()
            .filter(|t| t.matches(intent, language))
            .max_by_key(|t| (t.priority, t.created_seq))?;

        self.store.record_template_use(&best.id);
        TraceEvent::TemplateRendered {
            template_id: best.id.clone(),
            intent: intent.to_owned(),
            language: language.to_owned(),
        }
        .emit();

        Some(RenderedResponse {
            text: interpolate(&best.body, ctx),
            quick_replies: best.quick_replies.clone(),
            source: ResponseSource::Template(best.id),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{BotRule, RuleTrigger};
    use crate::templates::ResponseTemplate;
    use sb_context::with_tenant;
    use sb_domain::error::Error;

    fn engine(dir: &tempfile::TempDir) -> CustomLogicEngine {
        let store = Arc::new(CustomLogicStore::new(dir.path()).unwrap());
        CustomLogicEngine::new(store, RoutingConfig::default())
    }

    fn rule(id: &str, trigger: RuleTrigger, priority: i32, response: &str) -> BotRule {
        BotRule {
            id: id.into(),
            tenant_id: "t1".into(),
            bot_id: "b1".into(),
            trigger,
            response: response.into(),
            quick_replies: vec![],
            priority,
            is_active: true,
            execution_count: 0,
            created_seq: 0,
        }
    }

    fn template(id: &str, intent: &str, priority: i32, body: &str) -> ResponseTemplate {
        ResponseTemplate {
            id: id.into(),
            tenant_id: "t1".into(),
            bot_id: "b1".into(),
            intent: intent.into(),
            language: "vi".into(),
            body: body.into(),
            quick_replies: vec![],
            priority,
            is_active: true,
            usage_count: 0,
            created_seq: 0,
        }
    }

    fn ctx() -> ConversationContext {
        ConversationContext::new("c1", "u1", "t1")
    }

    #[tokio::test]
    async fn rule_beats_template_regardless_of_priority() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(&dir);
        eng.store()
            .upsert_rule(rule("r1", RuleTrigger::Intent("greeting".into()), 5, "from rule"));
        eng.store()
            .upsert_template(template("tp1", "greeting", 100, "from template"));

        let out = with_tenant("t1", async {
            eng.evaluate("b1", Some("greeting"), "vi", "hello", &ctx())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(out.text, "from rule");
        assert_eq!(out.source, ResponseSource::Rule("r1".into()));
    }

    #[tokio::test]
    async fn highest_priority_rule_wins_ties_to_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(&dir);
        eng.store()
            .upsert_rule(rule("low", RuleTrigger::Always, 1, "low"));
        eng.store()
            .upsert_rule(rule("old", RuleTrigger::Always, 9, "old"));
        eng.store()
            .upsert_rule(rule("new", RuleTrigger::Always, 9, "new"));

        let out = with_tenant("t1", async {
            eng.evaluate("b1", None, "vi", "anything", &ctx())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(out.text, "new");
    }

    #[tokio::test]
    async fn template_scenario_renders_interpolated_body() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(&dir);
        eng.store()
            .upsert_template(template("tp1", "greeting", 0, "Chào {{user_name}}"));

        let mut c = ctx();
        c.metadata.insert("user_name".into(), "An".into());

        let out = with_tenant("t1", async {
            eng.evaluate("b1", Some("greeting"), "vi", "xin chào", &c)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(out.text, "Chào An");
        assert_eq!(out.source, ResponseSource::Template("tp1".into()));
    }

    #[tokio::test]
    async fn no_match_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(&dir);

        let out = with_tenant("t1", async {
            eng.evaluate("b1", Some("greeting"), "vi", "hello", &ctx())
        })
        .await
        .unwrap();

        assert!(out.is_none());
    }

    #[tokio::test]
    async fn counters_increment_on_match() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(&dir);
        eng.store()
            .upsert_rule(rule("r1", RuleTrigger::Always, 0, "hi"));

        with_tenant("t1", async {
            eng.evaluate("b1", None, "vi", "msg", &ctx()).unwrap();
            eng.evaluate("b1", None, "vi", "msg", &ctx()).unwrap();
        })
        .await;

        assert_eq!(eng.store().rules_for("t1", "b1")[0].execution_count, 2);
    }

    #[test]
    fn outside_tenant_scope_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let eng = engine(&dir);
        let err = eng
            .evaluate("b1", None, "vi", "msg", &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::NoTenantInScope));
    }
}
