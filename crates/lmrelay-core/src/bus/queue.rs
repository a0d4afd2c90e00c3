//! Async message bus between channels and the relay loop.
//!
//! Uses tokio::sync::mpsc bounded channels.

use super::types::{InboundMessage, OutboundEvent};
use tokio::sync::mpsc;

/// The message bus connecting channels ↔ relay loop.
///
/// - Channels publish to `inbound` (user messages arriving)
/// - The relay loop consumes `inbound` and publishes replies and typing
///   indicators to `outbound`
/// - The channel manager consumes `outbound` and routes to the right channel
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundEvent>,
    outbound_rx: tokio::sync::Mutex<mpsc::Receiver<OutboundEvent>>,
}

impl MessageBus {
    /// Create a new message bus with the given buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size);

        MessageBus {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
        }
    }

    /// Publish a message from a channel to the relay loop (inbound).
    pub async fn publish_inbound(
        &self,
        msg: InboundMessage,
    ) -> Result<(), mpsc::error::SendError<InboundMessage>> {
        self.inbound_tx.send(msg).await
    }

    /// Consume the next inbound message (blocks until available).
    /// Returns None if all senders are dropped.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    /// Publish an event from the relay loop to a channel (outbound).
    pub async fn publish_outbound(
        &self,
        event: impl Into<OutboundEvent>,
    ) -> Result<(), mpsc::error::SendError<OutboundEvent>> {
        self.outbound_tx.send(event.into()).await
    }

    /// Consume the next outbound event (blocks until available).
    /// Returns None if all senders are dropped.
    pub async fn consume_outbound(&self) -> Option<OutboundEvent> {
        let mut rx = self.outbound_rx.lock().await;
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::types::OutboundMessage;
    use crate::types::UserId;

    #[tokio::test]
    async fn test_inbound_message_flow() {
        let bus = MessageBus::new(10);

        let msg = InboundMessage::new("telegram", UserId(1), "chat_1", "Hello!");
        bus.publish_inbound(msg).await.unwrap();

        let received = bus.consume_inbound().await.unwrap();
        assert_eq!(received.channel, "telegram");
        assert_eq!(received.content, "Hello!");
    }

    #[tokio::test]
    async fn test_outbound_accepts_messages_and_typing() {
        let bus = MessageBus::new(10);

        bus.publish_outbound(OutboundEvent::Typing {
            channel: "telegram".into(),
            chat_id: "42".into(),
        })
        .await
        .unwrap();
        bus.publish_outbound(OutboundMessage::new("telegram", "42", "Response here"))
            .await
            .unwrap();

        let first = bus.consume_outbound().await.unwrap();
        assert!(matches!(first, OutboundEvent::Typing { .. }));

        match bus.consume_outbound().await.unwrap() {
            OutboundEvent::Message(msg) => assert_eq!(msg.content, "Response here"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_message_ordering() {
        let bus = MessageBus::new(10);

        for i in 1..=3 {
            let msg = InboundMessage::new("cli", UserId(1), "default", format!("msg-{}", i));
            bus.publish_inbound(msg).await.unwrap();
        }

        let m1 = bus.consume_inbound().await.unwrap();
        let m2 = bus.consume_inbound().await.unwrap();
        let m3 = bus.consume_inbound().await.unwrap();

        assert_eq!(m1.content, "msg-1");
        assert_eq!(m2.content, "msg-2");
        assert_eq!(m3.content, "msg-3");
    }

    #[tokio::test]
    async fn test_multiple_producers() {
        let bus = std::sync::Arc::new(MessageBus::new(10));

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let h1 = tokio::spawn(async move {
            let msg = InboundMessage::new("telegram", UserId(1), "c1", "from one");
            bus1.publish_inbound(msg).await.unwrap();
        });

        let h2 = tokio::spawn(async move {
            let msg = InboundMessage::new("telegram", UserId(2), "c2", "from two");
            bus2.publish_inbound(msg).await.unwrap();
        });

        h1.await.unwrap();
        h2.await.unwrap();

        let r1 = bus.consume_inbound().await.unwrap();
        let r2 = bus.consume_inbound().await.unwrap();

        let senders = [r1.sender_id, r2.sender_id];
        assert!(senders.contains(&UserId(1)));
        assert!(senders.contains(&UserId(2)));
    }
}
