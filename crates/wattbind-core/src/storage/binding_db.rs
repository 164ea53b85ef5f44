//! SQLite-backed binding and schedule storage.
//!
//! A binding associates exactly one chat identity (user or group) with one
//! room; each binding can carry at most one daily schedule entry. Removing
//! a binding removes its schedule in the same transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::identity::ChatIdentity;

use super::data_dir;
use super::history_db::RoomKey;

/// A persistent identity -> room association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Stable surrogate key. Scheduler jobs are keyed by this id, not by
    /// the chat identity, so unbind-then-rebind cannot collide with a
    /// stale job.
    pub id: String,
    pub identity: ChatIdentity,
    pub room: RoomKey,
    pub created_at: DateTime<Utc>,
}

/// Daily query time for one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub binding_id: String,
    pub hour: u8,
    pub minute: u8,
}

fn row_to_binding(row: &rusqlite::Row) -> Result<Binding, rusqlite::Error> {
    let id: String = row.get(0)?;
    let user_id: Option<String> = row.get(1)?;
    let group_id: Option<String> = row.get(2)?;
    let campus: String = row.get(3)?;
    let building: String = row.get(4)?;
    let room: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    // The schema CHECK constraints guarantee exactly one id is present.
    let identity = match (user_id, group_id) {
        (Some(u), None) => ChatIdentity::User(u),
        (None, Some(g)) => ChatIdentity::Group(g),
        _ => {
            return Err(rusqlite::Error::InvalidColumnType(
                1,
                "binding identity".into(),
                rusqlite::types::Type::Null,
            ))
        }
    };

    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Binding {
        id,
        identity,
        room: RoomKey {
            campus,
            building,
            room,
        },
        created_at,
    })
}

fn identity_columns(identity: &ChatIdentity) -> (Option<&str>, Option<&str>) {
    match identity {
        ChatIdentity::User(id) => (Some(id.as_str()), None),
        ChatIdentity::Group(id) => (None, Some(id.as_str())),
    }
}

/// SQLite store for bindings and their schedules.
pub struct BindingDb {
    conn: Mutex<Connection>,
}

impl BindingDb {
    /// Open the binding store at `~/.config/wattbind/wattbind.db`.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?
            .join("wattbind.db");
        Self::open_at(&path)
    }

    /// Open the binding store at an explicit path.
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
                "CREATE TABLE IF NOT EXISTS bindings (
                    id         TEXT PRIMARY KEY,
                    user_id    TEXT UNIQUE,
                    group_id   TEXT UNIQUE,
                    campus     TEXT NOT NULL,
                    building   TEXT NOT NULL,
                    room       TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    CHECK (user_id IS NOT NULL OR group_id IS NOT NULL),
                    CHECK ((user_id IS NULL AND group_id IS NOT NULL)
                        OR (user_id IS NOT NULL AND group_id IS NULL))
                );

                CREATE TABLE IF NOT EXISTS schedules (
                    id         TEXT PRIMARY KEY,
                    binding_id TEXT NOT NULL UNIQUE,
                    hour       INTEGER NOT NULL,
                    minute     INTEGER NOT NULL
                );",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))
    }

    /// Bind an identity to a room. Rebinding an already-bound identity
    /// keeps the binding id (and therefore any schedule) and only moves
    /// the room.
    pub fn set_binding(
        &self,
        identity: &ChatIdentity,
        room: &RoomKey,
    ) -> Result<Binding, StorageError> {
        let conn = self.lock();
        let (user_id, group_id) = identity_columns(identity);

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM bindings
                 WHERE (?1 IS NOT NULL AND user_id = ?1)
                    OR (?2 IS NOT NULL AND group_id = ?2)",
                params![user_id, group_id],
                |row| row.get(0),
            )
            .optional()?;

        let (id, created_at) = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE bindings SET campus = ?2, building = ?3, room = ?4 WHERE id = ?1",
                    params![id, room.campus, room.building, room.room],
                )?;
                let created_at: String = conn.query_row(
                    "SELECT created_at FROM bindings WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                (id, created_at)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let created_at = Utc::now();
                conn.execute(
                    "INSERT INTO bindings (id, user_id, group_id, campus, building, room, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        id,
                        user_id,
                        group_id,
                        room.campus,
                        room.building,
                        room.room,
                        created_at.to_rfc3339(),
                    ],
                )?;
                (id, created_at)
            }
        };

        Ok(Binding {
            id,
            identity: identity.clone(),
            room: room.clone(),
            created_at,
        })
    }

    /// Look up the binding for an identity.
    pub fn binding_for(&self, identity: &ChatIdentity) -> Result<Option<Binding>, StorageError> {
        let conn = self.lock();
        let (user_id, group_id) = identity_columns(identity);
        let binding = conn
            .query_row(
                "SELECT id, user_id, group_id, campus, building, room, created_at
                 FROM bindings
                 WHERE (?1 IS NOT NULL AND user_id = ?1)
                    OR (?2 IS NOT NULL AND group_id = ?2)",
                params![user_id, group_id],
                row_to_binding,
            )
            .optional()?;
        Ok(binding)
    }

    /// Look up a binding by its surrogate id.
    pub fn binding_by_id(&self, id: &str) -> Result<Option<Binding>, StorageError> {
        let conn = self.lock();
        let binding = conn
            .query_row(
                "SELECT id, user_id, group_id, campus, building, room, created_at
                 FROM bindings WHERE id = ?1",
                params![id],
                row_to_binding,
            )
            .optional()?;
        Ok(binding)
    }

    /// Remove an identity's binding and any schedule it carries, in one
    /// transaction. Returns the removed binding's id, or None if the
    /// identity was not bound.
    pub fn delete_binding(&self, identity: &ChatIdentity) -> Result<Option<String>, StorageError> {
        let mut conn = self.lock();
        let (user_id, group_id) = identity_columns(identity);

        let tx = conn.transaction().map_err(StorageError::from)?;
        let id: Option<String> = tx
            .query_row(
                "SELECT id FROM bindings
                 WHERE (?1 IS NOT NULL AND user_id = ?1)
                    OR (?2 IS NOT NULL AND group_id = ?2)",
                params![user_id, group_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = &id {
            tx.execute("DELETE FROM schedules WHERE binding_id = ?1", params![id])?;
            tx.execute("DELETE FROM bindings WHERE id = ?1", params![id])?;
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(id)
    }

    /// Set (or replace) the daily schedule for a binding.
    pub fn set_schedule(
        &self,
        binding_id: &str,
        hour: u8,
        minute: u8,
    ) -> Result<ScheduleEntry, StorageError> {
        self.lock().execute(
            "INSERT INTO schedules (id, binding_id, hour, minute)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(binding_id) DO UPDATE SET hour = ?3, minute = ?4",
            params![Uuid::new_v4().to_string(), binding_id, hour, minute],
        )?;
        Ok(ScheduleEntry {
            binding_id: binding_id.to_string(),
            hour,
            minute,
        })
    }

    /// The schedule for a binding, if one is set.
    pub fn schedule_for(&self, binding_id: &str) -> Result<Option<ScheduleEntry>, StorageError> {
        let conn = self.lock();
        let entry = conn
            .query_row(
                "SELECT binding_id, hour, minute FROM schedules WHERE binding_id = ?1",
                params![binding_id],
                |row| {
                    Ok(ScheduleEntry {
                        binding_id: row.get(0)?,
                        hour: row.get(1)?,
                        minute: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Remove the schedule for a binding. Returns whether one existed.
    pub fn delete_schedule(&self, binding_id: &str) -> Result<bool, StorageError> {
        let deleted = self.lock().execute(
            "DELETE FROM schedules WHERE binding_id = ?1",
            params![binding_id],
        )?;
        Ok(deleted > 0)
    }

    /// All schedule entries, for scheduler startup.
    pub fn all_schedules(&self) -> Result<Vec<ScheduleEntry>, StorageError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT binding_id, hour, minute FROM schedules")?;
        let rows = stmt.query_map([], |row| {
            Ok(ScheduleEntry {
                binding_id: row.get(0)?,
                hour: row.get(1)?,
                minute: row.get(2)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
