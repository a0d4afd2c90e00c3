//! Model gateway layer for lmrelay.
//!
//! # Architecture
//!
//! - [`traits::ModelGateway`] — trait the session manager talks to
//! - [`http_gateway::HttpGateway`] — OpenAI-compatible HTTP client
//! - [`error::GatewayError`] — transport / status / payload failure classes

pub mod error;
pub mod http_gateway;
pub mod traits;

// Re-export main types for convenience
pub use error::GatewayError;
pub use http_gateway::HttpGateway;
pub use traits::{Completion, ModelGateway};
