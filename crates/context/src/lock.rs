//! Per-conversation concurrency control.
//!
//! Takeover, release, and idle reclamation for the same conversation
//! must be linearizable: each conversation id maps to a `Semaphore(1)`
//! and callers hold the permit across the whole transition. Different
//! conversations never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use sb_domain::error::{Error, Result};

/// Manages per-conversation transition locks.
pub struct ConversationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for ConversationLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the transition lock for a conversation. Waits if another
    /// transition is in flight; the permit auto-releases on drop.
    pub async fn acquire(&self, conversation_id: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(conversation_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned()
            .await
            .map_err(|_| Error::Other(format!("lock closed for conversation {conversation_id}")))
    }

    /// Number of tracked conversations (for monitoring).
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    /// Drop lock entries that nobody currently holds (cleanup sweep).
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_acquire_release() {
        let map = ConversationLockMap::new();
        let p1 = map.acquire("c1").await.unwrap();
        drop(p1);
        let p2 = map.acquire("c1").await.unwrap();
        drop(p2);
    }

    #[tokio::test]
    async fn different_conversations_do_not_contend() {
        let map = ConversationLockMap::new();
        let _p1 = map.acquire("c1").await.unwrap();
        let _p2 = map.acquire("c2").await.unwrap();
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn same_conversation_waits_for_permit() {
        let map = Arc::new(ConversationLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("c1").await.unwrap();

        let waiter = tokio::spawn(async move {
            let _p2 = map2.acquire("c1").await.unwrap();
            7
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(p1);

        assert_eq!(waiter.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let map = ConversationLockMap::new();
        let _held = map.acquire("held").await.unwrap();
        let released = map.acquire("released").await.unwrap();
        drop(released);

        map.prune_idle();
        assert_eq!(map.len(), 1);
    }
}
