pub mod dispatcher;
pub mod handoff;
pub mod reclaimer;

pub use dispatcher::{
    delivery_from_config, ChannelDelivery, HttpChannelDelivery, MessageDispatcher,
    NoopChannelDelivery,
};
pub use handoff::HandoffOps;
pub use reclaimer::IdleReclaimer;
