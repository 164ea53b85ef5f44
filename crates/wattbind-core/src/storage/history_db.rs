//! SQLite-backed balance reading history.
//!
//! One append-only series of readings per room. Consecutive identical
//! values are not stored twice; insertion order is chronological order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

use super::data_dir;

/// A single balance observation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub recorded_at: DateTime<Utc>,
    /// Remaining balance in kWh-equivalent units.
    pub value: f64,
}

/// Composite room identity. Comparison is case-sensitive exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub campus: String,
    pub building: String,
    pub room: String,
}

impl RoomKey {
    pub fn new(
        campus: impl Into<String>,
        building: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            campus: campus.into(),
            building: building.into(),
            room: room.into(),
        }
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.campus, self.building, self.room)
    }
}

/// SQLite store for per-room reading history.
///
/// Writes are serialized through an internal mutex so concurrent appends
/// for the same room cannot interleave.
pub struct HistoryDb {
    conn: Mutex<Connection>,
}

impl HistoryDb {
    /// Open the history store at `~/.config/wattbind/wattbind.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?
            .join("wattbind.db");
        Self::open_at(&path)
    }

    /// Open the history store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory store (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.lock()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS readings (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    campus      TEXT NOT NULL,
                    building    TEXT NOT NULL,
                    room        TEXT NOT NULL,
                    value       REAL NOT NULL,
                    recorded_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_readings_room
                    ON readings(campus, building, room, id);",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))
    }

    /// Record a reading unless it repeats the last stored value for the
    /// room. Returns whether a new row was written. The write is committed
    /// before this returns.
    pub fn append(&self, room: &RoomKey, reading: &Reading) -> Result<bool, StorageError> {
        let conn = self.lock();
        let last: Option<f64> = conn
            .query_row(
                "SELECT value FROM readings
                 WHERE campus = ?1 AND building = ?2 AND room = ?3
                 ORDER BY id DESC LIMIT 1",
                params![room.campus, room.building, room.room],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StorageError::from(other)),
            })?;

        if last == Some(reading.value) {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO readings (campus, building, room, value, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                room.campus,
                room.building,
                room.room,
                reading.value,
                reading.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(true)
    }

    /// All readings for a room in chronological (insertion) order.
    pub fn series(&self, room: &RoomKey) -> Result<Vec<Reading>, StorageError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT recorded_at, value FROM readings
             WHERE campus = ?1 AND building = ?2 AND room = ?3
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![room.campus, room.building, room.room], |row| {
            let recorded_at: String = row.get(0)?;
            let value: f64 = row.get(1)?;
            Ok((recorded_at, value))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (recorded_at, value) = row?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| StorageError::QueryFailed(format!("bad recorded_at: {e}")))?
                .with_timezone(&Utc);
            readings.push(Reading { recorded_at, value });
        }
        Ok(readings)
    }

    /// Remove all readings for a room. Returns the number of rows deleted.
    pub fn clear(&self, room: &RoomKey) -> Result<usize, StorageError> {
        let deleted = self.lock().execute(
            "DELETE FROM readings WHERE campus = ?1 AND building = ?2 AND room = ?3",
            params![room.campus, room.building, room.room],
        )?;
        Ok(deleted)
    }
}
