pub mod registry;
pub mod ws;

pub use registry::{AgentSink, TakeoverRegistry};
