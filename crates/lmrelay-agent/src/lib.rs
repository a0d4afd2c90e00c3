//! lmrelay agent — command routing, per-user sessions, and the relay loop.
//!
//! This crate contains:
//! - **router**: classifies message text into directives or chat
//! - **session**: registration gating and the single-exchange context flow
//! - **relay_loop**: consumes the bus and publishes replies

pub mod relay_loop;
pub mod replies;
pub mod router;
pub mod session;

pub use relay_loop::RelayLoop;
pub use router::{Command, Directive};
pub use session::{ChatError, ChatTurn, SessionManager};
