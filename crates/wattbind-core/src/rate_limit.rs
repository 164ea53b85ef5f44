//! Per-identity sliding-window query throttle.
//!
//! Each identity carries a queue of query timestamps inside the trailing
//! window. Entries older than the window are pruned lazily on every
//! check; a denied check records nothing. Windows are persisted so a
//! process restart does not reset them.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::StorageError;
use crate::identity::ChatIdentity;
use crate::storage::data_dir;

/// Sliding-window rate limiter keyed by chat identity.
///
/// The connection mutex doubles as the identity-scoped critical section:
/// a check and its own record can never interleave with another check.
pub struct RateLimiter {
    conn: Mutex<Connection>,
    window_secs: i64,
    threshold: usize,
}

impl RateLimiter {
    /// Open the limiter store at `~/.config/wattbind/wattbind.db` with
    /// the given window and threshold.
    pub fn open(window_secs: i64, threshold: usize) -> Result<Self, StorageError> {
        let path = data_dir()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?
            .join("wattbind.db");
        Self::open_at(&path, window_secs, threshold)
    }

    /// Open the limiter store at an explicit path.
    pub fn open_at(path: &Path, window_secs: i64, threshold: usize) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn, window_secs, threshold)
    }

    /// Open an in-memory limiter (for tests).
    #[cfg(test)]
    pub fn open_memory(window_secs: i64, threshold: usize) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Self::with_connection(conn, window_secs, threshold)
    }

    fn with_connection(
        conn: Connection,
        window_secs: i64,
        threshold: usize,
    ) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rate_windows (
                identity   TEXT PRIMARY KEY,
                timestamps TEXT NOT NULL
            );",
        )
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            window_secs,
            threshold,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check the identity against the window and record the query if
    /// allowed. Returns whether the query may proceed.
    pub fn check_and_record(&self, identity: &ChatIdentity) -> Result<bool, StorageError> {
        self.check_and_record_at(identity, Utc::now().timestamp())
    }

    /// Same as [`check_and_record`](Self::check_and_record) with an
    /// injected clock, so tests can advance virtual time.
    pub fn check_and_record_at(
        &self,
        identity: &ChatIdentity,
        now: i64,
    ) -> Result<bool, StorageError> {
        let key = identity.key();
        let conn = self.lock();

        let raw: Option<String> = conn
            .query_row(
                "SELECT timestamps FROM rate_windows WHERE identity = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        let mut window: VecDeque<i64> = match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::QueryFailed(format!("bad rate window: {e}")))?,
            None => VecDeque::new(),
        };

        // Lazy eviction: drop entries that have aged out of the window.
        while let Some(&oldest) = window.front() {
            if now - oldest >= self.window_secs {
                window.pop_front();
            } else {
                break;
            }
        }

        let allowed = window.len() < self.threshold;
        if allowed {
            window.push_back(now);
        } else {
            debug!(identity = %identity, "query rate limit reached");
        }

        let raw = serde_json::to_string(&window)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO rate_windows (identity, timestamps) VALUES (?1, ?2)",
            params![key, raw],
        )?;

        Ok(allowed)
    }
}
