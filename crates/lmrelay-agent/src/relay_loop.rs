//! Relay loop — consumes inbound messages, routes them, publishes replies.
//!
//! Every inbound message is handled on its own task, so a slow model call
//! for one user never holds up another. Per-user ordering is enforced by the
//! session manager.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use lmrelay_core::bus::{ContentFormat, InboundMessage, MessageBus, OutboundEvent, OutboundMessage};
use lmrelay_core::types::UserId;

use crate::replies;
use crate::router::{Command, Directive};
use crate::session::{ChatError, SessionManager};

// ─────────────────────────────────────────────
// RelayLoop
// ─────────────────────────────────────────────

/// Connects the message bus to the session manager.
#[derive(Clone)]
pub struct RelayLoop {
    bus: Arc<MessageBus>,
    sessions: Arc<SessionManager>,
}

impl RelayLoop {
    pub fn new(bus: Arc<MessageBus>, sessions: Arc<SessionManager>) -> Self {
        Self { bus, sessions }
    }

    /// Run until the inbound channel closes.
    pub async fn run(&self) {
        info!("relay loop started, waiting for messages");
        while let Some(msg) = self.bus.consume_inbound().await {
            debug!(
                channel = %msg.channel,
                user_id = %msg.sender_id,
                chat_id = %msg.chat_id,
                "received message"
            );

            let this = self.clone();
            tokio::spawn(async move {
                let reply = this.process_message(&msg).await;
                if let Err(e) = this.bus.publish_outbound(reply).await {
                    error!(error = %e, "failed to publish outbound message");
                }
            });
        }
        info!("inbound channel closed, relay loop exiting");
    }

    /// Handle one inbound message and build the reply.
    ///
    /// Chat messages from registered users first publish a typing indicator
    /// for their chat.
    pub async fn process_message(&self, msg: &InboundMessage) -> OutboundMessage {
        self.respond(msg, true).await
    }

    /// Direct processing for the local CLI: no bus traffic, plain reply text.
    pub async fn process_direct(&self, user_id: UserId, text: &str) -> String {
        let msg = InboundMessage::new("cli", user_id, "direct", text);
        self.respond(&msg, false).await.content
    }

    async fn respond(&self, msg: &InboundMessage, announce_typing: bool) -> OutboundMessage {
        let user_id = msg.sender_id;

        match Command::parse(&msg.content) {
            Command::Directive(Directive::Register) => {
                debug!(user_id = %user_id, "register directive");
                let text = self
                    .sessions
                    .handle_register(user_id)
                    .await
                    .unwrap_or_else(|e| failure_text(user_id, e, replies::CHAT_FAILED));
                OutboundMessage::reply(msg, text)
            }
            Command::Directive(Directive::ClearContext) => {
                debug!(user_id = %user_id, "clear directive");
                let text = self
                    .sessions
                    .handle_clear(user_id)
                    .await
                    .unwrap_or_else(|e| failure_text(user_id, e, replies::CHAT_FAILED));
                OutboundMessage::reply(msg, text)
            }
            Command::Directive(Directive::ShowModel) => {
                debug!(user_id = %user_id, "model directive");
                match self.sessions.handle_show_model().await {
                    Ok(text) => OutboundMessage::reply(msg, text).with_format(ContentFormat::Markdown),
                    Err(e) => OutboundMessage::reply(
                        msg,
                        failure_text(user_id, e, replies::MODEL_LOOKUP_FAILED),
                    ),
                }
            }
            Command::Chat(text) => {
                let result = match self.sessions.begin_chat(user_id).await {
                    Ok(turn) => {
                        if announce_typing {
                            self.announce_typing(msg).await;
                        }
                        turn.exchange(&text).await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok(reply) => OutboundMessage::reply(msg, reply).with_format(ContentFormat::Html),
                    Err(e) => {
                        OutboundMessage::reply(msg, failure_text(user_id, e, replies::CHAT_FAILED))
                    }
                }
            }
        }
    }

    async fn announce_typing(&self, msg: &InboundMessage) {
        if let Err(e) = self.bus.publish_outbound(OutboundEvent::typing_for(msg)).await {
            warn!(error = %e, "failed to publish typing indicator");
        }
    }
}

/// Reply text for a failed operation.
fn failure_text(user_id: UserId, err: ChatError, fallback: &str) -> String {
    match err {
        ChatError::NotRegistered(_) => replies::REGISTRATION_REQUIRED.to_string(),
        // Already logged where the backend call failed.
        ChatError::UpstreamFailure(_) => fallback.to_string(),
        ChatError::Internal(e) => {
            error!(user_id = %user_id, error = %e, "session store failure");
            fallback.to_string()
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
