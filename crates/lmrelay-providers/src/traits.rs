//! Model gateway trait — the seam between the session manager and the backend.

use async_trait::async_trait;
use lmrelay_core::types::ChatMessage;

use crate::error::GatewayError;

/// A successful completion.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    /// First choice of the response, always assistant-role.
    pub reply: ChatMessage,
    /// The backend's `usage` object, passed through untouched.
    pub usage: Option<serde_json::Value>,
}

/// Request/response adapter to a language-model backend.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the message list verbatim and return the first reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GatewayError>;

    /// Identifier of the first model the backend lists.
    async fn list_model_name(&self) -> Result<String, GatewayError>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
