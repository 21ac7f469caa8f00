//! Live subscription table for agent connections.
//!
//! Forward map: conversation id → watching connections and their
//! outbound sinks. Reverse map: connection id → conversation id, for
//! O(1) cleanup on disconnect. Both maps live behind one mutex so a
//! watch-move is atomic: a concurrent broadcaster never observes a
//! connection in two conversations' sets, nor transiently in neither.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use sb_domain::conversation::TakeoverMessage;
use sb_domain::trace::TraceEvent;

/// Outbound channel toward one agent connection. The WS writer task on
/// the other end forwards everything to the socket.
pub type AgentSink = mpsc::Sender<TakeoverMessage>;

#[derive(Default)]
struct Maps {
    forward: HashMap<String, HashMap<String, AgentSink>>,
    reverse: HashMap<String, String>,
}

pub struct TakeoverRegistry {
    maps: Mutex<Maps>,
}

impl Default for TakeoverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TakeoverRegistry {
    pub fn new() -> Self {
        Self {
            maps: Mutex::new(Maps::default()),
        }
    }

    /// Subscribe a connection to a conversation. A connection watches at
    /// most one conversation: watching a new one atomically moves it,
    /// pruning the old set if it becomes empty.
    pub fn watch(&self, connection_id: &str, conversation_id: &str, sink: AgentSink) {
        let moved_from = {
            let mut maps = self.maps.lock();

            let previous = maps.reverse.insert(
                connection_id.to_owned(),
                conversation_id.to_owned(),
            );
            if let Some(old) = &previous {
                if old != conversation_id {
                    if let Some(set) = maps.forward.get_mut(old) {
                        set.remove(connection_id);
                        if set.is_empty() {
                            maps.forward.remove(old);
                        }
                    }
                }
            }

            maps.forward
                .entry(conversation_id.to_owned())
                .or_default()
                .insert(connection_id.to_owned(), sink);

            previous.filter(|old| old != conversation_id)
        };

        TraceEvent::WatchStarted {
            connection_id: connection_id.to_owned(),
            conversation_id: conversation_id.to_owned(),
            moved_from,
        }
        .emit();
    }

    /// Drop a connection's subscription. Idempotent: unknown or already
    /// removed connections are a no-op (a disconnect racing an explicit
    /// unwatch must not error).
    pub fn unwatch(&self, connection_id: &str) {
        let removed = {
            let mut maps = self.maps.lock();
            let conversation_id = match maps.reverse.remove(connection_id) {
                Some(c) => c,
                None => return,
            };
            if let Some(set) = maps.forward.get_mut(&conversation_id) {
                set.remove(connection_id);
                if set.is_empty() {
                    maps.forward.remove(&conversation_id);
                }
            }
            conversation_id
        };

        TraceEvent::WatchEnded {
            connection_id: connection_id.to_owned(),
            conversation_id: removed,
        }
        .emit();
    }

    /// Fan a message out to every connection watching the conversation.
    /// Closed sinks are skipped, not fatal; nobody watching is a cheap
    /// no-op.
    pub fn broadcast(&self, conversation_id: &str, message: &TakeoverMessage) {
        let sinks: Vec<(String, AgentSink)> = {
            let maps = self.maps.lock();
            match maps.forward.get(conversation_id) {
                Some(set) => set
                    .iter()
                    .map(|(id, sink)| (id.clone(), sink.clone()))
                    .collect(),
                None => {
                    tracing::debug!(conversation_id, "broadcast with no watchers");
                    return;
                }
            }
        };

        let watchers = sinks.len();
        let mut skipped_closed = 0usize;
        for (connection_id, sink) in sinks {
            if sink.try_send(message.clone()).is_err() {
                tracing::debug!(
                    connection_id = %connection_id,
                    conversation_id,
                    "skipping closed or congested agent sink"
                );
                skipped_closed += 1;
            }
        }

        TraceEvent::BroadcastFanOut {
            conversation_id: conversation_id.to_owned(),
            watchers,
            skipped_closed,
        }
        .emit();
    }

    /// The conversation a connection currently watches, if any.
    pub fn watching(&self, connection_id: &str) -> Option<String> {
        self.maps.lock().reverse.get(connection_id).cloned()
    }

    pub fn watcher_count(&self, conversation_id: &str) -> usize {
        self.maps
            .lock()
            .forward
            .get(conversation_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Total live connections across all conversations.
    pub fn connection_count(&self) -> usize {
        self.maps.lock().reverse.len()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use sb_domain::conversation::MessageSender;

    fn sink() -> (AgentSink, mpsc::Receiver<TakeoverMessage>) {
        mpsc::channel(8)
    }

    #[test]
    fn watch_then_broadcast_delivers() {
        let registry = TakeoverRegistry::new();
        let (tx, mut rx) = sink();
        registry.watch("conn-1", "c1", tx);

        registry.broadcast("c1", &TakeoverMessage::now("c1", MessageSender::User, "hi"));

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.conversation_id, "c1");
    }

    #[test]
    fn watch_move_leaves_old_conversation() {
        let registry = TakeoverRegistry::new();
        let (tx, mut rx) = sink();
        registry.watch("conn-1", "a", tx.clone());
        registry.watch("conn-1", "b", tx);

        assert_eq!(registry.watcher_count("a"), 0);
        assert_eq!(registry.watcher_count("b"), 1);
        assert_eq!(registry.watching("conn-1").as_deref(), Some("b"));

        registry.broadcast("a", &TakeoverMessage::now("a", MessageSender::User, "for a"));
        registry.broadcast("b", &TakeoverMessage::now("b", MessageSender::User, "for b"));

        // Only the current subscription receives anything.
        assert_eq!(rx.try_recv().unwrap().conversation_id, "b");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unwatch_is_idempotent() {
        let registry = TakeoverRegistry::new();
        let (tx, _rx) = sink();
        registry.watch("conn-1", "c1", tx);

        registry.unwatch("conn-1");
        registry.unwatch("conn-1");
        registry.unwatch("never-watched");

        assert_eq!(registry.watcher_count("c1"), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn closed_sink_is_skipped_not_fatal() {
        let registry = TakeoverRegistry::new();
        let (tx_open, mut rx_open) = sink();
        let (tx_closed, rx_closed) = sink();
        drop(rx_closed);
        registry.watch("open", "c1", tx_open);
        registry.watch("closed", "c1", tx_closed);

        registry.broadcast("c1", &TakeoverMessage::now("c1", MessageSender::Bot, "reply"));

        assert_eq!(rx_open.try_recv().unwrap().content, "reply");
    }

    #[test]
    fn broadcast_without_watchers_is_a_noop() {
        let registry = TakeoverRegistry::new();
        registry.broadcast("ghost", &TakeoverMessage::now("ghost", MessageSender::User, "x"));
    }

    #[test]
    fn rewatching_same_conversation_keeps_single_entry() {
        let registry = TakeoverRegistry::new();
        let (tx, _rx) = sink();
        registry.watch("conn-1", "c1", tx.clone());
        registry.watch("conn-1", "c1", tx);
        assert_eq!(registry.watcher_count("c1"), 1);
    }
}
