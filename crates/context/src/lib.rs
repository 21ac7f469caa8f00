//! Conversation-scoped state for Switchboard: tenant scoping, the
//! conversation context/flag stores, and per-conversation locks.

pub mod lock;
pub mod store;
pub mod tenant;

pub use lock::ConversationLockMap;
pub use store::{ConversationContextStore, ConversationStore};
pub use tenant::{current_tenant, with_tenant};
