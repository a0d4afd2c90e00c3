//! `lmrelay status` — show configuration, backend, and storage status.

use anyhow::Result;
use colored::Colorize;

use lmrelay_core::config::{get_config_path, load_config};
use lmrelay_core::session::{SessionStore, SqliteSessionStore};
use lmrelay_core::utils::{expand_home, truncate_string};

fn mark(ok: bool, missing: &str) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        missing.red().to_string()
    }
}

pub async fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "lmrelay status".cyan().bold());
    println!();

    println!(
        "  {:<14} {} {}",
        "Config:".bold(),
        config_path.display(),
        mark(config_path.exists(), "(not found, using defaults)")
    );

    // Backend
    let backend = &config.backend;
    println!("  {:<14} {}", "Backend:".bold(), backend.api_base);
    println!(
        "  {:<14} {}",
        "Model:".bold(),
        backend.model().unwrap_or("(server default)")
    );
    println!(
        "  {:<14} {} | timeout: {}s",
        "API key:".bold(),
        if backend.api_key().is_some() {
            "set".green().to_string()
        } else {
            "none".dimmed().to_string()
        },
        backend.timeout().as_secs()
    );

    // Storage; only opened when present so status never creates a database.
    let db_path = expand_home(&config.storage.database_path);
    let users = if db_path.exists() {
        match SqliteSessionStore::open(&db_path) {
            Ok(store) => match store.count().await {
                Ok(n) => format!("{n} registered user(s)"),
                Err(e) => format!("unreadable: {e}").red().to_string(),
            },
            Err(e) => format!("unreadable: {e}").red().to_string(),
        }
    } else {
        "(not created yet)".dimmed().to_string()
    };
    println!(
        "  {:<14} {} {}",
        "Database:".bold(),
        db_path.display(),
        users
    );

    // Telegram
    let telegram = &config.channels.telegram;
    let allowed = if telegram.allowed_users.is_empty() {
        "everyone".to_string()
    } else {
        format!("{} allowed user(s)", telegram.allowed_users.len())
    };
    println!(
        "  {:<14} {} {}",
        "Telegram:".bold(),
        mark(telegram.is_configured(), "· no token"),
        allowed.dimmed()
    );

    println!(
        "  {:<14} {}",
        "Prompt:".bold(),
        truncate_string(&config.relay.system_prompt.replace('\n', " "), 60).dimmed()
    );
    println!();

    Ok(())
}
