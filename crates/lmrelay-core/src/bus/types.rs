//! Bus event types — messages flowing between channels and the relay loop.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::UserId;

/// An inbound message from a channel to the relay loop.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Channel name (e.g. "telegram", "cli").
    pub channel: String,
    /// Sender identifier; keys the user's session.
    pub sender_id: UserId,
    /// Chat/conversation identifier replies are sent to.
    pub chat_id: String,
    /// Text content of the message.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
    /// Channel-specific metadata (e.g. message_id, username).
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    /// Create a new inbound message with minimal required fields.
    pub fn new(
        channel: impl Into<String>,
        sender_id: UserId,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            channel: channel.into(),
            sender_id,
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Channel message id of this message, if the channel recorded one.
    pub fn message_id(&self) -> Option<&str> {
        self.metadata.get("message_id").map(String::as_str)
    }
}

/// How the channel should interpret the outbound text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

/// An outbound text message from the relay loop to a channel.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    /// Target channel name.
    pub channel: String,
    /// Target chat/conversation identifier.
    pub chat_id: String,
    /// Text content to send.
    pub content: String,
    /// Markup of `content`.
    pub format: ContentFormat,
    /// Optional message ID to reply to.
    pub reply_to: Option<String>,
    /// Channel-specific metadata.
    pub metadata: HashMap<String, String>,
}

impl OutboundMessage {
    /// Create a new plain-text outbound message.
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        OutboundMessage {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            format: ContentFormat::Plain,
            reply_to: None,
            metadata: HashMap::new(),
        }
    }

    /// Plain-text reply addressed back to the chat an inbound message came from.
    pub fn reply(to: &InboundMessage, content: impl Into<String>) -> Self {
        let mut msg = OutboundMessage::new(&to.channel, &to.chat_id, content);
        msg.reply_to = to.message_id().map(String::from);
        msg
    }

    /// Set the content format.
    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.format = format;
        self
    }
}

/// Everything the relay loop can ask a channel to do.
#[derive(Clone, Debug)]
pub enum OutboundEvent {
    /// Deliver a text message.
    Message(OutboundMessage),
    /// Show a "typing…" indicator in a chat.
    Typing { channel: String, chat_id: String },
}

impl OutboundEvent {
    /// Target channel name.
    pub fn channel(&self) -> &str {
        match self {
            OutboundEvent::Message(msg) => &msg.channel,
            OutboundEvent::Typing { channel, .. } => channel,
        }
    }

    /// Typing indicator for the chat an inbound message came from.
    pub fn typing_for(msg: &InboundMessage) -> Self {
        OutboundEvent::Typing {
            channel: msg.channel.clone(),
            chat_id: msg.chat_id.clone(),
        }
    }
}

impl From<OutboundMessage> for OutboundEvent {
    fn from(msg: OutboundMessage) -> Self {
        OutboundEvent::Message(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_creation() {
        let msg = InboundMessage::new("telegram", UserId(42), "99", "Hello!");

        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.sender_id, UserId(42));
        assert_eq!(msg.chat_id, "99");
        assert_eq!(msg.content, "Hello!");
        assert!(msg.metadata.is_empty());
        assert!(msg.message_id().is_none());
    }

    #[test]
    fn test_outbound_message_defaults_to_plain() {
        let msg = OutboundMessage::new("telegram", "99", "Here's your answer!");

        assert_eq!(msg.format, ContentFormat::Plain);
        assert!(msg.reply_to.is_none());
    }

    #[test]
    fn test_reply_threads_onto_inbound() {
        let mut inbound = InboundMessage::new("telegram", UserId(1), "chat_1", "hi");
        inbound
            .metadata
            .insert("message_id".to_string(), "12345".to_string());

        let reply = OutboundMessage::reply(&inbound, "hello").with_format(ContentFormat::Html);

        assert_eq!(reply.channel, "telegram");
        assert_eq!(reply.chat_id, "chat_1");
        assert_eq!(reply.reply_to.as_deref(), Some("12345"));
        assert_eq!(reply.format, ContentFormat::Html);
    }

    #[test]
    fn test_typing_event_targets_inbound_chat() {
        let inbound = InboundMessage::new("telegram", UserId(1), "chat_7", "hi");
        let event = OutboundEvent::typing_for(&inbound);

        assert_eq!(event.channel(), "telegram");
        match event {
            OutboundEvent::Typing { chat_id, .. } => assert_eq!(chat_id, "chat_7"),
            OutboundEvent::Message(_) => panic!("expected typing event"),
        }
    }
}
