//! Routing decision types returned by the decision engine.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decision
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The bot pipeline handles the message; a response is attached.
    BotProcess,
    /// A human agent must handle the message (already taken over, or
    /// every automated path failed).
    HumanRequired,
    /// The message is dropped without advancing conversation state.
    Blocked,
}

/// A response produced by the custom-logic layer or a bot provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedResponse {
    pub text: String,
    #[serde(default)]
    pub quick_replies: Vec<String>,
    /// Where the response came from: a rule id, template id, or provider id.
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResponseSource {
    Rule(String),
    Template(String),
    Provider(String),
}

/// Full outcome of one `decide` call.
///
/// `reason` is always present when the decision is not [`Decision::BotProcess`].
/// `should_update_context` is false only for [`Decision::Blocked`], since a
/// blocked message must not advance conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: Decision,
    #[serde(default)]
    pub reason: Option<String>,
    pub should_update_context: bool,
    #[serde(default)]
    pub response: Option<RenderedResponse>,
}

impl DecisionOutcome {
    pub fn bot_process(response: RenderedResponse) -> Self {
        Self {
            decision: Decision::BotProcess,
            reason: None,
            should_update_context: true,
            response: Some(response),
        }
    }

    pub fn human_required(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::HumanRequired,
            reason: Some(reason.into()),
            should_update_context: true,
            response: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Blocked,
            reason: Some(reason.into()),
            should_update_context: false,
            response: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_bot_outcomes_carry_a_reason() {
        let human = DecisionOutcome::human_required("already assigned to human agent");
        assert_eq!(human.decision, Decision::HumanRequired);
        assert!(human.reason.is_some());
        assert!(human.should_update_context);

        let blocked = DecisionOutcome::blocked("sender banned");
        assert_eq!(blocked.decision, Decision::Blocked);
        assert!(blocked.reason.is_some());
        assert!(!blocked.should_update_context);
    }

    #[test]
    fn bot_process_carries_response_and_updates_context() {
        let outcome = DecisionOutcome::bot_process(RenderedResponse {
            text: "hi".into(),
            quick_replies: vec![],
            source: ResponseSource::Provider("dialog-engine".into()),
        });
        assert_eq!(outcome.decision, Decision::BotProcess);
        assert!(outcome.reason.is_none());
        assert!(outcome.should_update_context);
        assert_eq!(outcome.response.unwrap().text, "hi");
    }

    #[test]
    fn decision_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Decision::HumanRequired).unwrap(),
            "\"human_required\""
        );
    }
}
