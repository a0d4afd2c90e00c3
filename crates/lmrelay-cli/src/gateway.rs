//! Gateway command — Telegram channel plus relay loop.
//!
//! Startup sequence:
//! 1. Load config, refuse to start without a bot token
//! 2. Build store, gateway, session manager, bus, relay loop
//! 3. Register the Telegram channel
//! 4. Run relay loop and channel manager until Ctrl+C

use anyhow::{bail, Result};
use tracing::{error, info};

use lmrelay_channels::ChannelManager;
use lmrelay_core::config::{get_config_path, load_config};

use crate::helpers;

pub async fn run() -> Result<()> {
    helpers::print_banner("Gateway");

    let config = load_config(None);
    let telegram = &config.channels.telegram;
    if !telegram.is_configured() {
        bail!(
            "no Telegram bot token configured: set channels.telegram.token in {} \
             or the API_TOKEN environment variable",
            get_config_path().display()
        );
    }

    let (bus, relay) = crate::build_relay(&config)?;

    #[allow(unused_mut)]
    let mut channel_manager = ChannelManager::new(bus.clone());

    #[cfg(feature = "telegram")]
    {
        use lmrelay_channels::telegram::TelegramChannel;
        use std::sync::Arc;

        channel_manager.register(Arc::new(TelegramChannel::new(
            &telegram.token,
            bus.clone(),
            telegram.allowed_users.clone(),
        )));
    }

    if channel_manager.is_empty() {
        bail!("this build has no Telegram support; rebuild with the `telegram` feature");
    }

    info!(
        backend = %config.backend.api_base,
        channels = ?channel_manager.channel_names(),
        "gateway starting"
    );

    println!("  Backend:   {}", config.backend.api_base);
    println!("  Database:  {}", config.storage.database_path);
    if !telegram.allowed_users.is_empty() {
        println!("  Allowed:   {} user(s)", telegram.allowed_users.len());
    }
    println!();
    println!("  Ctrl+C to stop");
    println!();

    tokio::select! {
        _ = relay.run() => {
            info!("relay loop exited");
        }
        result = channel_manager.start_all() => {
            if let Err(e) = result {
                error!(error = %e, "channel manager error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            channel_manager.stop_all().await;
        }
    }

    println!("  Gateway stopped. Goodbye!");
    Ok(())
}
