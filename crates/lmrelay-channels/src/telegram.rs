//! Telegram channel — bot integration via `teloxide`.
//!
//! - Long polling (no webhook/public IP needed)
//! - Text messages only; commands go to the bus like any other text
//! - Messages without a sender are dropped
//! - Allow-list by user ID or username
//! - Typing indicator on request from the relay loop
//! - Replies thread onto the message they answer
//! - Messages over 4096 chars are split

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ChatAction, MessageId, ParseMode, ReplyParameters, UpdateKind};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use lmrelay_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use lmrelay_core::types::UserId;

use crate::base::Channel;
use crate::formatting::plan_chunks;

/// Telegram message length limit.
const TELEGRAM_MAX_LEN: usize = 4096;

/// Seconds a `getUpdates` long poll waits for new updates.
const POLL_TIMEOUT_SECS: u32 = 30;

// ─────────────────────────────────────────────
// TelegramChannel
// ─────────────────────────────────────────────

/// Telegram bot channel using long polling.
pub struct TelegramChannel {
    bot: Bot,
    bus: Arc<MessageBus>,
    /// Allow-list of user IDs / usernames. Empty = allow everyone.
    allowed_users: Vec<String>,
    shutdown: Arc<Notify>,
}

impl TelegramChannel {
    pub fn new(token: &str, bus: Arc<MessageBus>, allowed_users: Vec<String>) -> Self {
        Self {
            bot: Bot::new(token),
            bus,
            allowed_users,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Empty allow-list = allow everyone; otherwise the numeric id or the
    /// username (with or without `@`) must be listed.
    fn is_allowed(&self, user_id: &str, username: Option<&str>) -> bool {
        if self.allowed_users.is_empty() {
            return true;
        }

        self.allowed_users.iter().any(|allowed| {
            let allowed = allowed.trim_start_matches('@');
            allowed == user_id || username.is_some_and(|name| allowed == name)
        })
    }

    /// Turn a Telegram update into an inbound bus message, if it carries one.
    fn to_inbound(&self, update: &Update) -> Option<InboundMessage> {
        let UpdateKind::Message(message) = &update.kind else {
            return None;
        };
        let chat_id = message.chat.id.0.to_string();

        let Some(user) = message.from.as_ref() else {
            warn!(chat = %chat_id, "telegram message without sender, dropping");
            return None;
        };
        let Ok(raw_id) = i64::try_from(user.id.0) else {
            warn!(user = user.id.0, "telegram user id out of range, dropping");
            return None;
        };

        let user_id = raw_id.to_string();
        let username = user.username.as_deref();
        if !self.is_allowed(&user_id, username) {
            warn!(
                user = %user_id,
                chat = %chat_id,
                "telegram message from unauthorized user, ignoring"
            );
            return None;
        }

        let Some(text) = message.text() else {
            debug!(user = %user_id, "non-text telegram message, ignoring");
            return None;
        };

        let mut inbound = InboundMessage::new("telegram", UserId(raw_id), chat_id, text);
        inbound
            .metadata
            .insert("message_id".into(), message.id.0.to_string());
        inbound
            .metadata
            .insert("first_name".into(), user.first_name.clone());
        if let Some(name) = username {
            inbound.metadata.insert("username".into(), name.to_string());
        }
        let is_group = message.chat.is_group() || message.chat.is_supergroup();
        inbound
            .metadata
            .insert("is_group".into(), is_group.to_string());

        Some(inbound)
    }

    async fn handle_update(&self, update: &Update) {
        let Some(inbound) = self.to_inbound(update) else {
            return;
        };

        debug!(
            user = %inbound.sender_id,
            chat = %inbound.chat_id,
            content_len = inbound.content.len(),
            "telegram inbound message"
        );

        if let Err(e) = self.bus.publish_inbound(inbound).await {
            error!(error = %e, "failed to publish telegram message to bus");
        }
    }

    /// Send one chunk, threading it onto `reply_to` when given.
    async fn send_chunk(
        &self,
        chat: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to: Option<MessageId>,
    ) -> Result<(), teloxide::RequestError> {
        let mut request = self.bot.send_message(chat, text);
        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(id));
        }
        request.await.map(|_| ())
    }
}

fn parse_chat_id(chat_id: &str) -> anyhow::Result<ChatId> {
    let id: i64 = chat_id
        .parse()
        .with_context(|| format!("invalid telegram chat_id: {chat_id}"))?;
    Ok(ChatId(id))
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> anyhow::Result<()> {
        info!("starting telegram channel (long polling)");

        let commands = vec![
            BotCommand::new("start", "Register and show available commands"),
            BotCommand::new("model", "Show the language model in use"),
            BotCommand::new("clear", "Clear the dialogue context"),
        ];
        if let Err(e) = self.bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to set bot commands menu");
        }

        info!("telegram bot connected, polling for updates");

        let mut offset: i32 = 0;
        loop {
            tokio::select! {
                updates = self.bot.get_updates().offset(offset).timeout(POLL_TIMEOUT_SECS).send() => {
                    match updates {
                        Ok(updates) => {
                            for update in &updates {
                                offset = (update.id.0 as i32).wrapping_add(1);
                                self.handle_update(update).await;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "telegram polling error");
                            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("telegram channel shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        info!("stopping telegram channel");
        self.shutdown.notify_waiters();
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        let chat = parse_chat_id(&msg.chat_id)?;
        let reply_to = msg
            .reply_to
            .as_deref()
            .and_then(|id| id.parse().ok())
            .map(MessageId);

        let chunks = plan_chunks(&msg.content, msg.format, TELEGRAM_MAX_LEN);
        for (i, chunk) in chunks.iter().enumerate() {
            let reply = if i == 0 { reply_to } else { None };

            if let Some(html) = &chunk.html {
                match self.send_chunk(chat, html, Some(ParseMode::Html), reply).await {
                    Ok(()) => continue,
                    Err(e) => debug!(
                        error = %e,
                        chunk = i,
                        "HTML send failed, retrying chunk as plain text"
                    ),
                }
            }

            self.send_chunk(chat, &chunk.plain, None, reply)
                .await
                .context("telegram send failed")?;
        }

        debug!(chat_id = chat.0, chunks = chunks.len(), "telegram message sent");
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> anyhow::Result<()> {
        let chat = parse_chat_id(chat_id)?;
        self.bot
            .send_chat_action(chat, ChatAction::Typing)
            .await
            .context("telegram typing indicator failed")?;
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
