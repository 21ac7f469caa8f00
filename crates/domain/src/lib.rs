//! Shared domain types for Switchboard: errors, configuration, trace
//! events, and the conversation/decision model used across all crates.

pub mod config;
pub mod conversation;
pub mod decision;
pub mod error;
pub mod trace;
