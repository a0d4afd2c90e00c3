//! Core types for lmrelay.
//!
//! These types model the OpenAI chat completions format spoken by the model
//! backend, plus the per-user session record persisted by the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────

/// Stable identifier of a chat user (Telegram user id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// Role tag of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message, serialized as `{"role": ..., "content": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Context pair
// ─────────────────────────────────────────────

/// The most recent completed exchange carried into the next request.
///
/// On disk and on the wire this is a two-element list: the user entry
/// followed by the assistant entry. Anything else fails to deserialize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChatMessage>", into = "Vec<ChatMessage>")]
pub struct ContextPair {
    pub user: String,
    pub assistant: String,
}

impl ContextPair {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        ContextPair {
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    /// The pair as request messages, user entry first.
    pub fn to_messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::user(&self.user),
            ChatMessage::assistant(&self.assistant),
        ]
    }
}

/// Why a message list could not be turned into a [`ContextPair`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("context must hold exactly 2 messages, found {0}")]
    WrongLength(usize),
    #[error("context must be a user message followed by an assistant message")]
    WrongRoles,
}

impl TryFrom<Vec<ChatMessage>> for ContextPair {
    type Error = ContextError;

    fn try_from(messages: Vec<ChatMessage>) -> Result<Self, Self::Error> {
        let [first, second]: [ChatMessage; 2] = messages
            .try_into()
            .map_err(|rest: Vec<ChatMessage>| ContextError::WrongLength(rest.len()))?;

        match (first.role, second.role) {
            (Role::User, Role::Assistant) => Ok(ContextPair {
                user: first.content,
                assistant: second.content,
            }),
            _ => Err(ContextError::WrongRoles),
        }
    }
}

impl From<ContextPair> for Vec<ChatMessage> {
    fn from(pair: ContextPair) -> Self {
        vec![
            ChatMessage::user(pair.user),
            ChatMessage::assistant(pair.assistant),
        ]
    }
}

// ─────────────────────────────────────────────
// Session record
// ─────────────────────────────────────────────

/// Per-user persisted record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub registered_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub context: Option<ContextPair>,
}

// ─────────────────────────────────────────────
// Backend wire format
// ─────────────────────────────────────────────

/// Request body for `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Raw chat completion response. Only the fields the relay reads are typed.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

/// The assistant message within a choice. `content` may be null on the wire.
#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Response of `GET /models`.
#[derive(Debug, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelEntry>,
}

/// One model listed by the backend.
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
