//! Session storage — durable per-user records keyed by `UserId`.
//!
//! # Table layout
//!
//! ```text
//! users(user_id INTEGER PRIMARY KEY, registration_date TEXT, last_active_date TEXT, context TEXT)
//! ```
//!
//! `context` is NULL or a JSON list `[{"role":"user",...},{"role":"assistant",...}]`.

pub mod sqlite;
pub mod store;

pub use sqlite::SqliteSessionStore;
pub use store::{SessionStore, StoreError};
