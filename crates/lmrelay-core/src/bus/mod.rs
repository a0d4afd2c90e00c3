//! Message bus — decouples chat channels from the relay loop.

pub mod queue;
pub mod types;

pub use queue::MessageBus;
pub use types::{ContentFormat, InboundMessage, OutboundEvent, OutboundMessage};
