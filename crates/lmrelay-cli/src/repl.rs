//! Interactive REPL over the relay loop.
//!
//! Uses `rustyline` for line editing with persistent history. Input goes
//! through the same router as Telegram text, so `/start`, `/model` and
//! `/clear` work here too.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use lmrelay_agent::RelayLoop;
use lmrelay_core::types::UserId;
use lmrelay_core::utils::{get_data_path, truncate_string};

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(relay: RelayLoop, user_id: UserId) -> Result<()> {
    helpers::print_banner(&format!("Chat as user {user_id}"));
    println!("  Send /start first to register. Type \"exit\" to quit.");
    println!();

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }

        let _ = editor.add_history_entry(trimmed);

        debug!(user_id = %user_id, input = %truncate_string(trimmed, 80), "processing input");
        helpers::print_thinking();
        let reply = relay.process_direct(user_id, trimmed).await;
        helpers::clear_thinking();
        helpers::print_response(&reply);
    }

    save_history(&mut editor);
    Ok(())
}

fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let path = history_path();
    if path.exists() {
        let _ = editor.load_history(&path);
        debug!("loaded REPL history from {}", path.display());
    }

    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

fn history_path() -> std::path::PathBuf {
    get_data_path().join("history").join("cli_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
