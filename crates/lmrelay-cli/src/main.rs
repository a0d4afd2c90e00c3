//! lmrelay CLI — entry point.
//!
//! # Commands
//!
//! - `lmrelay gateway` — run the Telegram bot
//! - `lmrelay chat [-m MESSAGE] [-u USER_ID]` — talk to the relay locally
//! - `lmrelay status` — show configuration and storage status
//! - `lmrelay onboard` — write the default config

mod gateway;
mod helpers;
mod onboard;
mod repl;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use lmrelay_agent::{RelayLoop, SessionManager};
use lmrelay_core::bus::MessageBus;
use lmrelay_core::config::{load_config, Config};
use lmrelay_core::session::SqliteSessionStore;
use lmrelay_core::types::UserId;
use lmrelay_core::utils::expand_home;
use lmrelay_providers::HttpGateway;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// lmrelay — relay chat messages to a local language model
#[derive(Parser)]
#[command(name = "lmrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot until Ctrl+C
    Gateway {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Chat locally through the same commands and sessions as the bot
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// User id whose session is used
        #[arg(short, long, default_value_t = 1)]
        user: i64,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and storage status
    Status,

    /// Write the default configuration file
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Gateway { logs } => {
            init_logging(logs);
            gateway::run().await
        }
        Commands::Chat {
            message,
            user,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, UserId(user)).await
        }
        Commands::Status => status::run().await,
        Commands::Onboard => onboard::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>, user_id: UserId) -> Result<()> {
    let config = load_config(None);
    let (_bus, relay) = build_relay(&config)?;

    match message {
        Some(msg) => {
            info!(user_id = %user_id, "processing single message");
            let reply = relay.process_direct(user_id, &msg).await;
            helpers::print_response(&reply);
        }
        None => repl::run(relay, user_id).await?,
    }

    Ok(())
}

/// Wire store, gateway, session manager, and relay loop from the config.
pub fn build_relay(config: &Config) -> Result<(Arc<MessageBus>, RelayLoop)> {
    let db_path = expand_home(&config.storage.database_path);
    let store = SqliteSessionStore::open(&db_path)
        .with_context(|| format!("failed to open session database: {}", db_path.display()))?;

    let gateway = HttpGateway::new(&config.backend).context("failed to create model gateway")?;

    let sessions = SessionManager::new(Arc::new(store), Arc::new(gateway))
        .with_system_prompt(config.relay.system_prompt.as_str());

    // tokio's mpsc rejects a zero capacity
    let bus = Arc::new(MessageBus::new(config.relay.bus_capacity.max(1)));
    let relay = RelayLoop::new(bus.clone(), Arc::new(sessions));

    info!(
        backend = %config.backend.api_base,
        database = %db_path.display(),
        "relay initialized"
    );

    Ok((bus, relay))
}

/// Initialize tracing. `RUST_LOG` wins over the `--logs` switch.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "lmrelay=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
