//! Takeover lifecycle: an agent takes a conversation, the bot goes
//! silent, messages fan out to the watcher, and release (manual or via
//! the idle sweep) hands control back to the bot.

use std::sync::Arc;

use sb_context::{ConversationContextStore, ConversationLockMap, ConversationStore};
use sb_domain::config::{ReclaimConfig, RoutingConfig};
use sb_domain::conversation::MessageSender;
use sb_domain::decision::Decision;
use sb_gateway::runtime::{HandoffOps, IdleReclaimer, MessageDispatcher, NoopChannelDelivery};
use sb_gateway::takeover::TakeoverRegistry;
use sb_providers::stub::StaticBotProvider;
use sb_providers::{BotProvider, ProviderRegistry, ProviderSelector};
use sb_routing::{CustomLogicEngine, CustomLogicStore, DecideRequest, DecisionEngine};
use tokio::sync::mpsc;

struct Fixture {
    _dir: tempfile::TempDir,
    contexts: Arc<ConversationContextStore>,
    conversations: Arc<ConversationStore>,
    handoff: Arc<HandoffOps>,
    registry: Arc<TakeoverRegistry>,
    dispatcher: MessageDispatcher,
    engine: DecisionEngine,
    reclaimer: IdleReclaimer,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let contexts = Arc::new(ConversationContextStore::new(dir.path()).unwrap());
    let conversations = Arc::new(ConversationStore::new(dir.path()).unwrap());
    let logic = Arc::new(CustomLogicStore::new(dir.path()).unwrap());
    let handoff = Arc::new(HandoffOps::new(
        Arc::new(ConversationLockMap::new()),
        conversations.clone(),
        contexts.clone(),
    ));
    let registry = Arc::new(TakeoverRegistry::new());
    let dispatcher = MessageDispatcher::new(registry.clone(), Arc::new(NoopChannelDelivery));

    let provider = Arc::new(StaticBotProvider::new("stub", "bot reply", 10, 0.0, 0));
    let providers =
        ProviderRegistry::from_providers(vec![provider as Arc<dyn BotProvider>]);
    let engine = DecisionEngine::new(
        contexts.clone(),
        CustomLogicEngine::new(logic, RoutingConfig::default()),
        Arc::new(ProviderSelector::new(Arc::new(providers), 1_000)),
        RoutingConfig::default(),
    );
    let reclaimer = IdleReclaimer::new(
        handoff.clone(),
        conversations.clone(),
        ReclaimConfig {
            sweep_interval_secs: 30,
            idle_threshold_secs: 120,
        },
    );

    Fixture {
        _dir: dir,
        contexts,
        conversations,
        handoff,
        registry,
        dispatcher,
        engine,
        reclaimer,
    }
}

fn request(conversation_id: &str, message: &str) -> DecideRequest {
    DecideRequest {
        conversation_id: conversation_id.into(),
        user_id: "u1".into(),
        tenant_id: "t1".into(),
        bot_id: "b1".into(),
        intent: None,
        message: message.into(),
        language: None,
    }
}

#[tokio::test]
async fn takeover_silences_bot_until_release() {
    let f = fixture();

    // Bot handles the first message.
    let outcome = f.engine.decide(request("c1", "hello")).await.unwrap();
    assert_eq!(outcome.decision, Decision::BotProcess);

    // Agent takes over: bot goes silent.
    f.handoff.takeover("c1", "agent-1").await.unwrap();
    let outcome = f.engine.decide(request("c1", "anyone there?")).await.unwrap();
    assert_eq!(outcome.decision, Decision::HumanRequired);
    assert!(outcome.reason.unwrap().contains("already assigned"));

    // Release: bot resumes.
    f.handoff.release("c1", "agent done").await.unwrap();
    let outcome = f.engine.decide(request("c1", "hello again")).await.unwrap();
    assert_eq!(outcome.decision, Decision::BotProcess);
}

#[tokio::test]
async fn watcher_sees_user_message_while_human_holds_the_conversation() {
    let f = fixture();
    f.engine.decide(request("c1", "hi")).await.unwrap();
    f.handoff.takeover("c1", "agent-1").await.unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    f.registry.watch("conn-1", "c1", tx);

    let req = request("c1", "I need a human");
    let outcome = f.engine.decide(req.clone()).await.unwrap();
    f.dispatcher.dispatch(&req, &outcome).await;

    // The user message reaches the watching agent; no bot message does.
    let msg = rx.try_recv().unwrap();
    assert_eq!(msg.sender, MessageSender::User);
    assert_eq!(msg.content, "I need a human");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn flag_and_handler_stay_in_sync_through_the_whole_lifecycle() {
    let f = fixture();
    f.engine.decide(request("c1", "hi")).await.unwrap();

    f.handoff.takeover("c1", "agent-1").await.unwrap();
    assert!(f.conversations.get("c1").unwrap().taken_over_by_agent);
    assert!(f.contexts.get("c1").unwrap().is_human_held());

    f.handoff.release("c1", "done").await.unwrap();
    assert!(!f.conversations.get("c1").unwrap().taken_over_by_agent);
    assert!(!f.contexts.get("c1").unwrap().is_human_held());
}

#[tokio::test]
async fn idle_sweep_reclaims_and_bot_resumes() {
    let f = fixture();
    f.engine.decide(request("c1", "hi")).await.unwrap();
    f.handoff.takeover("c1", "agent-1").await.unwrap();

    // Simulate the agent walking away: backdate the activity clock.
    let mut conv = f.conversations.get("c1").unwrap();
    conv.updated_at = chrono::Utc::now() - chrono::Duration::seconds(600);
    f.conversations.save(conv);

    f.reclaimer.tick().await;

    assert!(!f.conversations.get("c1").unwrap().taken_over_by_agent);
    let outcome = f.engine.decide(request("c1", "still there?")).await.unwrap();
    assert_eq!(outcome.decision, Decision::BotProcess);
}
