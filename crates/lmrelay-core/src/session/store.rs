//! The `SessionStore` contract.
//!
//! A pure data-access layer: no registration policy lives here. Every
//! operation is keyed by `UserId` and atomic for that key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{ContextPair, Session, UserId};

/// Errors raised by a session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The operation needs an existing session and there is none.
    #[error("no session for user {0}")]
    NotFound(UserId),

    #[error("stored context for user {user_id} is invalid: {source}")]
    CorruptContext {
        user_id: UserId,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored timestamp for user {user_id} is invalid: {value:?}")]
    CorruptTimestamp { user_id: UserId, value: String },

    #[error("failed to serialize context: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("session database lock poisoned")]
    Poisoned,

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Durable mapping from user identifier to session record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the session if none exists (`registered_at = last_active_at = now`,
    /// no context). Returns `true` when a session was created, `false` when
    /// one already existed and was left untouched.
    async fn ensure_registered(&self, user_id: UserId, now: DateTime<Utc>)
        -> Result<bool, StoreError>;

    /// Advance `last_active_at` to `now`. Never moves it backwards.
    async fn touch_active(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Current context pair; `None` when absent or when the user has no session.
    async fn get_context(&self, user_id: UserId) -> Result<Option<ContextPair>, StoreError>;

    /// Replace the context pair, or reset it with `None`.
    async fn set_context(
        &self,
        user_id: UserId,
        context: Option<&ContextPair>,
    ) -> Result<(), StoreError>;

    /// Full session record, if any.
    async fn get(&self, user_id: UserId) -> Result<Option<Session>, StoreError>;

    /// Number of registered users.
    async fn count(&self) -> Result<u64, StoreError>;
}
