use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::types::PendingCheckout;

/// Lifetime of a pending-checkout record.
pub const CHECKOUT_TTL: Duration = Duration::from_secs(600);

/// Default store filename, next to the embedding application's working dir.
pub const STORE_FILE: &str = ".paypal-gateway.db";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_checkouts (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_expires ON pending_checkouts(expires_at);
"#;

/// Shared key-value store for pending-checkout records.
///
/// Implementations must be safe to call from concurrent request handlers;
/// each operation is atomic for its key.
pub trait CorrelationStore: Send + Sync {
    fn set(&self, key: &str, value: &PendingCheckout, ttl: Duration) -> Result<()>;
    /// Live record for `key`, ignoring expired ones.
    fn get(&self, key: &str) -> Result<Option<PendingCheckout>>;
    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// SQLite-backed store. WAL mode lets several processes share one file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SqliteStore {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open store")?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )
        .context("Failed to set pragmas")?;
        conn.execute_batch(SCHEMA).context("Failed to create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for tests).
    #[doc(hidden)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM pending_checkouts WHERE expires_at <= ?1",
                params![now_secs()],
            )
            .context("Failed to purge expired records")?;
        Ok(removed)
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM pending_checkouts WHERE expires_at > ?1",
                params![now_secs()],
                |row| row.get(0),
            )
            .context("Failed to count records")?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl CorrelationStore for SqliteStore {
    fn set(&self, key: &str, value: &PendingCheckout, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to encode record")?;
        let expires_at = now_secs() + ttl.as_secs() as i64;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO pending_checkouts (key, value, expires_at)
                 VALUES (?1, ?2, ?3)",
                params![key, json, expires_at],
            )
            .context("Failed to store record")?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<PendingCheckout>> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM pending_checkouts WHERE key = ?1 AND expires_at > ?2",
                params![key, now_secs()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query record")?;

        json.map(|j| serde_json::from_str(&j).context("Failed to decode record"))
            .transpose()
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM pending_checkouts WHERE key = ?1", params![key])
            .context("Failed to delete record")?;
        Ok(())
    }
}
