//! lmrelay core — shared types, message bus, configuration, and session storage.
//!
//! - **types**: chat messages, the single-exchange context pair, wire formats
//! - **bus**: bounded channels between transports and the relay loop
//! - **config**: JSON config schema, loader, env overrides
//! - **session**: the `SessionStore` contract and its SQLite implementation

pub mod bus;
pub mod config;
pub mod session;
pub mod types;
pub mod utils;

pub use types::{ChatMessage, ContextPair, Role, Session, UserId};
