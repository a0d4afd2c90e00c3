//! lmrelay channels — chat transports.
//!
//! This crate provides:
//! - **base**: the `Channel` trait every transport implements
//! - **manager**: `ChannelManager`, channel lifecycle and outbound routing
//! - **formatting**: Markdown → Telegram HTML and message splitting
//!
//! Transports are feature-gated modules.

pub mod base;
pub mod formatting;
pub mod manager;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use base::Channel;
pub use manager::ChannelManager;
