//! SQLite-backed session store.
//!
//! Each trait operation is a single SQL statement run on the blocking pool,
//! so updates for one user never interleave. The connection lock is held for
//! one statement at a time.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::store::{SessionStore, StoreError};
use crate::types::{ContextPair, Session, UserId};
use crate::utils::{format_timestamp, parse_timestamp};

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    registration_date TEXT,
    last_active_date TEXT,
    context TEXT
)";

/// Session store over a single SQLite database file.
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSessionStore").finish_non_exhaustive()
    }
}

impl SqliteSessionStore {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening session database");
        Self::init(Connection::open(path)?)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_USERS_TABLE, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

fn decode_context(user_id: UserId, raw: Option<String>) -> Result<Option<ContextPair>, StoreError> {
    raw.map(|text| {
        serde_json::from_str(&text).map_err(|source| StoreError::CorruptContext { user_id, source })
    })
    .transpose()
}

fn decode_timestamp(user_id: UserId, raw: Option<String>) -> Result<DateTime<Utc>, StoreError> {
    let value = raw.unwrap_or_default();
    parse_timestamp(&value).map_err(|_| StoreError::CorruptTimestamp { user_id, value })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn ensure_registered(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let now = format_timestamp(&now);
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (user_id, registration_date, last_active_date, context)
                 VALUES (?1, ?2, ?2, NULL)",
                params![user_id.0, now],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn touch_active(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let now = format_timestamp(&now);
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE users SET last_active_date = MAX(COALESCE(last_active_date, ?1), ?1)
                 WHERE user_id = ?2",
                params![now, user_id.0],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(user_id));
            }
            Ok(())
        })
        .await
    }

    async fn get_context(&self, user_id: UserId) -> Result<Option<ContextPair>, StoreError> {
        let raw = self
            .with_conn(move |conn| {
                let raw = conn
                    .query_row(
                        "SELECT context FROM users WHERE user_id = ?1",
                        params![user_id.0],
                        |row| row.get::<_, Option<String>>(0),
                    )
                    .optional()?;
                Ok(raw.flatten())
            })
            .await?;

        decode_context(user_id, raw)
    }

    async fn set_context(
        &self,
        user_id: UserId,
        context: Option<&ContextPair>,
    ) -> Result<(), StoreError> {
        let encoded = context
            .map(serde_json::to_string)
            .transpose()
            .map_err(StoreError::Serialize)?;

        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE users SET context = ?1 WHERE user_id = ?2",
                params![encoded, user_id.0],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(user_id));
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT registration_date, last_active_date, context
                         FROM users WHERE user_id = ?1",
                        params![user_id.0],
                        |row| {
                            Ok((
                                row.get::<_, Option<String>>(0)?,
                                row.get::<_, Option<String>>(1)?,
                                row.get::<_, Option<String>>(2)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        let Some((registered, last_active, context)) = row else {
            return Ok(None);
        };

        Ok(Some(Session {
            user_id,
            registered_at: decode_timestamp(user_id, registered)?,
            last_active_at: decode_timestamp(user_id, last_active)?,
            context: decode_context(user_id, context)?,
        }))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
