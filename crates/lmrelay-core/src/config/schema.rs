//! Configuration schema.
//!
//! Hierarchy: `Config` → `BackendConfig`, `ChannelsConfig`, `StorageConfig`,
//! `RelayConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Instruction sent as the first message of every model request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant.\nDo not use backslashes in your responses.";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.lmrelay/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub backend: BackendConfig,
    pub channels: ChannelsConfig,
    pub storage: StorageConfig,
    pub relay: RelayConfig,
}

// ─────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────

/// Language-model backend (any OpenAI-compatible server, LM Studio by default).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    /// Base URL including the `/v1` prefix.
    pub api_base: String,
    /// Bearer token; empty means no `Authorization` header.
    pub api_key: String,
    /// Model field sent with completions; empty lets the backend pick.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:1234/v1".to_string(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    /// Configured API key, if any.
    pub fn api_key(&self) -> Option<&str> {
        Some(self.api_key.as_str()).filter(|k| !k.is_empty())
    }

    /// Configured model name, if any.
    pub fn model(&self) -> Option<&str> {
        Some(self.model.as_str()).filter(|m| !m.is_empty())
    }

    /// Per-request timeout, at least one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ─────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────

/// All channel configurations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Telegram channel config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(default)]
    pub token: String,
    /// User ids or usernames allowed to talk to the bot. Empty = everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

// ─────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────

/// Session database location.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// SQLite file path; `~` is expanded.
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "~/.lmrelay/bot_database.db".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────

/// Relay loop behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// System instruction prepended to every request.
    pub system_prompt: String,
    /// Capacity of each message bus queue.
    pub bus_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            bus_capacity: 100,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
