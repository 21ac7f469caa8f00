//! Idle takeover reclamation.
//!
//! Agents sometimes walk away mid-conversation. Every sweep the
//! reclaimer loads all taken-over conversations across tenants and
//! releases any whose `updated_at` is older than the idle threshold,
//! using the same release operation a human would trigger. Failures are
//! isolated per conversation; one bad release never aborts the sweep.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use sb_context::ConversationStore;
use sb_domain::config::ReclaimConfig;
use sb_domain::trace::TraceEvent;

use crate::runtime::handoff::HandoffOps;

pub struct IdleReclaimer {
    handoff: Arc<HandoffOps>,
    conversations: Arc<ConversationStore>,
    config: ReclaimConfig,
}

impl IdleReclaimer {
    pub fn new(
        handoff: Arc<HandoffOps>,
        conversations: Arc<ConversationStore>,
        config: ReclaimConfig,
    ) -> Self {
        Self {
            handoff,
            conversations,
            config,
        }
    }

    /// One sweep. An empty candidate set is a no-op; a conversation a
    /// human released concurrently shows up as an idempotent
    /// `was_taken_over = false` release, not an error.
    pub async fn tick(&self) {
        let started = Instant::now();
        let now = Utc::now();
        let threshold = self.config.idle_threshold_secs as i64;

        let candidates = self.conversations.list_taken_over();
        let total = candidates.len();
        let mut released = 0usize;
        let mut failed = 0usize;

        for conv in candidates {
            if conv.idle_secs(now) < threshold {
                continue;
            }
            match self
                .handoff
                .release(&conv.conversation_id, "idle timeout")
                .await
            {
                Ok(was_taken_over) => {
                    if was_taken_over {
                        tracing::info!(
                            conversation_id = %conv.conversation_id,
                            agent_id = ?conv.agent_assigned_id,
                            idle_secs = conv.idle_secs(now),
                            "reclaimed idle conversation"
                        );
                        released += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conv.conversation_id,
                        error = %e,
                        "idle release failed, continuing sweep"
                    );
                    failed += 1;
                }
            }
        }

        TraceEvent::IdleSweepCompleted {
            candidates: total,
            released,
            failed,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sb_context::{ConversationContextStore, ConversationLockMap};

    struct Fixture {
        _dir: tempfile::TempDir,
        contexts: Arc<ConversationContextStore>,
        conversations: Arc<ConversationStore>,
        handoff: Arc<HandoffOps>,
        reclaimer: IdleReclaimer,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let contexts = Arc::new(ConversationContextStore::new(dir.path()).unwrap());
        let conversations = Arc::new(ConversationStore::new(dir.path()).unwrap());
        let handoff = Arc::new(HandoffOps::new(
            Arc::new(ConversationLockMap::new()),
            conversations.clone(),
            contexts.clone(),
        ));
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
            reclaimer,
        }
    }

    fn backdate(conversations: &ConversationStore, id: &str, secs: i64) {
        let mut conv = conversations.get(id).unwrap();
        conv.updated_at = Utc::now() - Duration::seconds(secs);
        conversations.save(conv);
    }

    #[tokio::test]
    async fn idle_conversation_is_released_fresh_one_is_kept() {
        let f = fixture();
        for id in ["stale", "fresh"] {
            f.contexts.get_or_create(id, "u1", "t1");
            f.handoff.takeover(id, "agent-1").await.unwrap();
        }
        backdate(&f.conversations, "stale", 300);

        f.reclaimer.tick().await;

        assert!(!f.conversations.get("stale").unwrap().taken_over_by_agent);
        assert!(!f.contexts.get("stale").unwrap().is_human_held());
        assert!(f.conversations.get("fresh").unwrap().taken_over_by_agent);
        assert!(f.contexts.get("fresh").unwrap().is_human_held());
    }

    #[tokio::test]
    async fn empty_candidate_set_is_a_noop() {
        let f = fixture();
        f.reclaimer.tick().await;
    }

    #[tokio::test]
    async fn human_release_racing_the_sweep_stays_idempotent() {
        let f = fixture();
        f.contexts.get_or_create("c1", "u1", "t1");
        f.handoff.takeover("c1", "agent-1").await.unwrap();
        backdate(&f.conversations, "c1", 300);

        // Human releases right before the sweep runs.
        f.handoff.release("c1", "manual").await.unwrap();
        f.reclaimer.tick().await;

        assert!(!f.conversations.get("c1").unwrap().taken_over_by_agent);
    }
}
