//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use lmrelay_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Backend: {}", cfg.backend.api_base);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use schema::Config;
