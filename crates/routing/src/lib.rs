//! Custom-logic evaluation and the routing decision engine.
//!
//! Tenants author [`rules::BotRule`]s and [`templates::ResponseTemplate`]s
//! that override generic provider behavior for specific intents or
//! conditions. The [`engine::DecisionEngine`] ties context, custom logic
//! and provider selection into one `decide` call per inbound message.

pub mod custom_logic;
pub mod engine;
pub mod interpolate;
pub mod rules;
pub mod store;
pub mod templates;

pub use custom_logic::CustomLogicEngine;
pub use engine::{DecideRequest, DecisionEngine};
pub use rules::{BotRule, ContextPredicate, RuleTrigger};
pub use store::CustomLogicStore;
pub use templates::ResponseTemplate;
