//! Channel Manager — channel lifecycle and outbound routing.
//!
//! Responsibilities:
//! - Register enabled channels
//! - Start all listeners concurrently via `tokio::spawn`
//! - Route outbound events from the bus to the channel they name

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use lmrelay_core::bus::{MessageBus, OutboundEvent};

use crate::base::Channel;

// ─────────────────────────────────────────────
// ChannelManager
// ─────────────────────────────────────────────

/// Owns the registered channels and the outbound dispatcher.
pub struct ChannelManager {
    /// Registered channels, keyed by name.
    channels: HashMap<String, Arc<dyn Channel>>,
    bus: Arc<MessageBus>,
    shutdown: Arc<Notify>,
}

impl ChannelManager {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self {
            channels: HashMap::new(),
            bus,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Register a channel. Replaces any channel with the same name.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        info!(channel = %name, "registered channel");
        self.channels.insert(name, channel);
    }

    /// Names of all registered channels, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Start every channel listener plus the outbound dispatcher, then wait
    /// for `stop_all()`.
    pub async fn start_all(&self) -> Result<()> {
        if self.channels.is_empty() {
            warn!("no channels registered, nothing to start");
            return Ok(());
        }

        info!(channels = ?self.channel_names(), "starting channels");

        for (name, channel) in &self.channels {
            let ch = channel.clone();
            let ch_name = name.clone();
            tokio::spawn(async move {
                info!(channel = %ch_name, "channel starting");
                if let Err(e) = ch.start().await {
                    error!(channel = %ch_name, error = %e, "channel start failed");
                }
                info!(channel = %ch_name, "channel stopped");
            });
        }

        let bus = self.bus.clone();
        let channels = self.channels.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            Self::dispatch_outbound(bus, channels, shutdown).await;
        });

        self.shutdown.notified().await;
        info!("channel manager shutting down");
        Ok(())
    }

    /// Stop all channels and the outbound dispatcher.
    pub async fn stop_all(&self) {
        self.shutdown.notify_waiters();

        for (name, channel) in &self.channels {
            debug!(channel = %name, "stopping channel");
            if let Err(e) = channel.stop().await {
                error!(channel = %name, error = %e, "channel stop failed");
            }
        }

        info!("all channels stopped");
    }

    /// Deliver one outbound event to its channel.
    async fn deliver(channels: &HashMap<String, Arc<dyn Channel>>, event: OutboundEvent) {
        let Some(channel) = channels.get(event.channel()) else {
            warn!(channel = %event.channel(), "no channel registered for outbound event");
            return;
        };

        match event {
            OutboundEvent::Message(msg) => {
                debug!(
                    channel = %msg.channel,
                    chat_id = %msg.chat_id,
                    content_len = msg.content.len(),
                    "dispatching outbound message"
                );
                if let Err(e) = channel.send(&msg).await {
                    error!(channel = %msg.channel, error = %e, "failed to send outbound message");
                }
            }
            OutboundEvent::Typing { channel: name, chat_id } => {
                if let Err(e) = channel.send_typing(&chat_id).await {
                    // A missing typing hint is cosmetic.
                    debug!(channel = %name, error = %e, "failed to send typing indicator");
                }
            }
        }
    }

    async fn dispatch_outbound(
        bus: Arc<MessageBus>,
        channels: HashMap<String, Arc<dyn Channel>>,
        shutdown: Arc<Notify>,
    ) {
        info!("outbound dispatcher started");

        loop {
            tokio::select! {
                event = bus.consume_outbound() => {
                    match event {
                        Some(event) => Self::deliver(&channels, event).await,
                        None => {
                            info!("outbound bus closed, dispatcher exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("dispatcher received shutdown signal");
                    break;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
