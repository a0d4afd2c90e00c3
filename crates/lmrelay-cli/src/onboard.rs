//! `lmrelay onboard` — write the default configuration.
//!
//! - Creates `~/.lmrelay/config.json` with defaults (never overwrites)
//! - Creates the data and history directories

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use lmrelay_core::config::{get_config_path, save_config, Config};
use lmrelay_core::utils::get_data_path;

pub fn run() -> Result<()> {
    println!();
    println!("{}", "lmrelay setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    if ensure_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let history_dir = get_data_path().join("history");
    std::fs::create_dir_all(&history_dir)
        .with_context(|| format!("failed to create {}", history_dir.display()))?;
    println!("  {} data dir at {}", "✓".green(), get_data_path().display());

    println!();
    println!("  Next steps:");
    println!("    1. Put your bot token in channels.telegram.token (or API_TOKEN in .env)");
    println!("    2. Point backend.apiBase at your model server");
    println!("    3. Run `lmrelay gateway`, or `lmrelay chat` to try it locally");
    println!();

    Ok(())
}

/// Write a default config to `path` unless one exists. Returns whether it
/// was created.
fn ensure_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
