//! Session manager — registration gating and the single-exchange chat flow.
//!
//! A user is unregistered until the register directive creates their
//! session. Chat and clear require a session; the model-name lookup does not.
//! Each successful chat replaces the stored context with the latest
//! (user, assistant) pair, so a request carries at most one prior exchange.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use lmrelay_core::config::schema::DEFAULT_SYSTEM_PROMPT;
use lmrelay_core::session::{SessionStore, StoreError};
use lmrelay_core::types::{ChatMessage, ContextPair, UserId};
use lmrelay_providers::{GatewayError, ModelGateway};

use crate::replies;

/// Why a session operation produced no normal reply.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The user has no session yet.
    #[error("user {0} is not registered")]
    NotRegistered(UserId),

    /// The model backend failed; stored context is untouched.
    #[error("model backend failed: {0}")]
    UpstreamFailure(#[from] GatewayError),

    /// The store failed in the middle of a validated flow.
    #[error("session store failed: {0}")]
    Internal(#[from] StoreError),
}

// ─────────────────────────────────────────────
// SessionManager
// ─────────────────────────────────────────────

/// Applies directives and chat turns to per-user sessions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn ModelGateway>,
    system_prompt: String,
    /// One async guard per user; chat and clear for a user run one at a time.
    user_locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            store,
            gateway,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the system instruction sent with every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Guard for a user already known to be registered. Inserts on first use.
    fn user_lock(&self, user_id: UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id).or_default().clone()
    }

    /// Guard for a user if one was ever created; never inserts.
    fn existing_lock(&self, user_id: UserId) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.get(&user_id).cloned()
    }

    /// Register the user if needed; always answers with the welcome text.
    pub async fn handle_register(&self, user_id: UserId) -> Result<String, ChatError> {
        let created = self.store.ensure_registered(user_id, Utc::now()).await?;
        if created {
            info!(user_id = %user_id, "new user registered");
        } else {
            debug!(user_id = %user_id, "user already registered");
        }
        Ok(replies::WELCOME.to_string())
    }

    /// Drop the stored exchange.
    pub async fn handle_clear(&self, user_id: UserId) -> Result<String, ChatError> {
        // Without a guard the user has never started a chat here, so there
        // is no exchange in flight to wait for.
        let _guard = match self.existing_lock(user_id) {
            Some(lock) => Some(lock.lock_owned().await),
            None => None,
        };

        match self.store.set_context(user_id, None).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => return Err(ChatError::NotRegistered(user_id)),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user_id, "dialogue context cleared");
        Ok(replies::CONTEXT_CLEARED.to_string())
    }

    /// Relay one chat message to the model and remember the exchange.
    pub async fn handle_chat(&self, user_id: UserId, text: &str) -> Result<String, ChatError> {
        self.begin_chat(user_id).await?.exchange(text).await
    }

    /// Validate the sender and take their guard.
    ///
    /// Records activity and fails with [`ChatError::NotRegistered`] before
    /// any per-user state is created. The returned turn holds the guard
    /// until [`ChatTurn::exchange`] finishes.
    pub async fn begin_chat(&self, user_id: UserId) -> Result<ChatTurn<'_>, ChatError> {
        // Existence check and activity update in one statement.
        match self.store.touch_active(user_id, Utc::now()).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                warn!(user_id = %user_id, "message from unregistered user");
                return Err(ChatError::NotRegistered(user_id));
            }
            Err(e) => return Err(e.into()),
        }

        let guard = self.user_lock(user_id).lock_owned().await;
        Ok(ChatTurn {
            manager: self,
            user_id,
            _guard: guard,
        })
    }

    /// Name of the model the backend serves, as a markdown reply.
    pub async fn handle_show_model(&self) -> Result<String, ChatError> {
        let model = self.gateway.list_model_name().await.map_err(|e| {
            error!(error = %e, "model lookup failed");
            ChatError::UpstreamFailure(e)
        })?;
        info!(model = %model, "model name requested");
        Ok(replies::model_in_use(&model))
    }

    /// System instruction, then the prior exchange if any, then the new text.
    pub fn build_request(&self, prior: Option<&ContextPair>, text: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(4);
        messages.push(ChatMessage::system(self.system_prompt.as_str()));
        if let Some(pair) = prior {
            messages.extend(pair.to_messages());
        }
        messages.push(ChatMessage::user(text));
        messages
    }
}

// ─────────────────────────────────────────────
// ChatTurn
// ─────────────────────────────────────────────

/// A validated chat exchange holding its user's guard.
pub struct ChatTurn<'a> {
    manager: &'a SessionManager,
    user_id: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl ChatTurn<'_> {
    /// Send `text` with the prior exchange and store the new one on success.
    pub async fn exchange(self, text: &str) -> Result<String, ChatError> {
        let SessionManager { store, gateway, .. } = self.manager;
        let user_id = self.user_id;

        let prior = match store.get_context(user_id).await {
            Ok(prior) => prior,
            Err(e @ StoreError::CorruptContext { .. }) => {
                warn!(user_id = %user_id, error = %e, "ignoring unreadable stored context");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let messages = self.manager.build_request(prior.as_ref(), text);
        debug!(
            user_id = %user_id,
            messages = messages.len(),
            gateway = %gateway.display_name(),
            "sending request to model"
        );

        let completion = gateway.complete(&messages).await.map_err(|e| {
            error!(user_id = %user_id, error = %e, "model request failed");
            ChatError::UpstreamFailure(e)
        })?;

        let reply = completion.reply.content;
        let exchange = ContextPair::new(text, reply.as_str());
        store.set_context(user_id, Some(&exchange)).await?;

        info!(user_id = %user_id, reply_len = reply.len(), "reply produced");
        Ok(reply)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
