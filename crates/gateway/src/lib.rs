//! Switchboard gateway: HTTP/WS surface, shared state, background loops.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod server;
pub mod state;
pub mod takeover;
pub mod telemetry;
