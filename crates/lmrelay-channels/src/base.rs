//! Channel trait — what a chat transport must provide.
//!
//! - `start()` listens for user messages and publishes them to the bus
//! - `stop()` ends the listener
//! - `send()` delivers a reply
//! - `send_typing()` shows a "typing…" hint, when the transport has one

use async_trait::async_trait;
use lmrelay_core::bus::OutboundMessage;

/// Every chat transport implements this trait.
///
/// The `ChannelManager` holds `Arc<dyn Channel>` values and routes outbound
/// events to them by name.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique channel name (e.g. "telegram").
    ///
    /// Must match `InboundMessage.channel` for the messages it publishes.
    fn name(&self) -> &str;

    /// Listen for incoming messages until `stop()` is called.
    async fn start(&self) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()>;

    /// Deliver a text message.
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()>;

    /// Show a typing indicator in `chat_id`. Transports without one ignore it.
    async fn send_typing(&self, _chat_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Transport that only records what it was asked to send.
    struct RecordingChannel {
        stopped: AtomicBool,
        sent: tokio::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
            self.sent.lock().await.push(msg.content.clone());
            Ok(())
        }
    }

    fn channel() -> RecordingChannel {
        RecordingChannel {
            stopped: AtomicBool::new(false),
            sent: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_default_typing_is_noop() {
        let ch = channel();
        ch.send_typing("chat_1").await.unwrap();
        assert!(ch.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_and_stop() {
        let ch = channel();
        ch.send(&OutboundMessage::new("recording", "chat_1", "Hello!"))
            .await
            .unwrap();
        ch.stop().await.unwrap();

        assert_eq!(*ch.sent.lock().await, vec!["Hello!".to_string()]);
        assert!(ch.stopped.load(Ordering::SeqCst));
    }
}
