//! Terminal output helpers.

use colored::Colorize;

/// Print a reply from the relay.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "lmrelay".cyan().bold());
    if response.is_empty() {
        println!("{}", "(empty reply)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print the name/version banner with the current mode.
pub fn print_banner(mode: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "lmrelay".cyan().bold(), version.dimmed());
    println!("  Mode: {mode}");
    println!();
}

/// Show a waiting hint on stderr while the model works.
pub fn print_thinking() {
    eprint!("{}", "… waiting for the model".dimmed());
}

pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}
