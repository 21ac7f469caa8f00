//! Bot provider adapters and selection for Switchboard.
//!
//! Every automation backend implements the same [`traits::BotProvider`]
//! shape; the [`registry::ProviderRegistry`] instantiates adapters from
//! config and the [`selector::ProviderSelector`] picks a healthy backend
//! (plus ordered fallbacks) per message.

pub mod http;
pub mod registry;
pub mod selector;
pub mod stub;
pub mod traits;

pub use registry::ProviderRegistry;
pub use selector::{ProviderSelection, ProviderSelector};
pub use traits::{BotMessageRequest, BotProvider, BotResponse, LoadSnapshot};
