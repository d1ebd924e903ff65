//! SQLite-backed user store.
//!
//! Provides persistent storage for:
//! - Check-in streaks and the time of the last accepted check-in
//! - The active transformation (label and interval) of each user

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::migrations;
use crate::error::DatabaseError;

/// One row of the `checkins` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub streak: u32,
    pub last_checkin: Option<DateTime<Utc>>,
    pub animal: Option<String>,
    pub transform_start: Option<DateTime<Utc>>,
    pub transform_end: Option<DateTime<Utc>>,
}

/// A user whose transformation has not yet ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTransformation {
    pub username: String,
    pub animal: Option<String>,
    pub transform_end: DateTime<Utc>,
}

/// Durable per-user state.
///
/// Every call is blocking and runs to completion; there is no atomicity across
/// calls beyond a single row update.
pub trait UserStore: Send + Sync {
    /// Look up a user's record.
    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError>;

    /// Create the record for a user's first check-in with a streak of 1.
    fn insert_first_checkin(&self, username: &str, at: DateTime<Utc>)
        -> Result<(), DatabaseError>;

    /// Store a new streak value and check-in time for an existing user.
    fn record_checkin(
        &self,
        username: &str,
        streak: u32,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Write the transformation fields of an existing row.
    ///
    /// Returns the number of rows changed; zero when the user has no record.
    fn set_transformation(
        &self,
        username: &str,
        animal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError>;

    /// Reset the transformation fields of a row to NULL, but only while the
    /// row still holds the transformation ending at `end`.
    ///
    /// Returns the number of rows changed; zero when the user has no record or
    /// a newer transformation replaced the one being cleared.
    fn clear_transformation(&self, username: &str, end: DateTime<Utc>)
        -> Result<usize, DatabaseError>;

    /// The stored transformation label for a user, if any.
    fn animal_for(&self, username: &str) -> Result<Option<String>, DatabaseError>;

    /// All rows whose `transform_end` is strictly after `now`.
    fn active_transformations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveTransformation>, DatabaseError>;
}

/// Format a timestamp the way it is stored: RFC 3339, millisecond precision, `Z`.
///
/// Fixed width, so text comparison in SQL matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::Corrupt {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn parse_optional(column: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    raw.map(|s| parse_timestamp(column, &s)).transpose()
}

/// SQLite database holding one row per user.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    ///
    /// Creates the schema if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the guard cannot leave SQLite half-written.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every stored record, ordered by username.
    pub fn all_users(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT username, streak, lastCheckin, animal, transform_start, transform_end
             FROM checkins ORDER BY username",
        )?;
        let rows = stmt.query_map([], raw_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(decode_row(row?)?);
        }
        Ok(users)
    }
}

type RawRow = (
    String,
    Option<u32>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_row(raw: RawRow) -> Result<UserRecord, DatabaseError> {
    let (username, streak, last, animal, start, end) = raw;
    Ok(UserRecord {
        username,
        streak: streak.unwrap_or(0),
        last_checkin: parse_optional("lastCheckin", last)?,
        animal,
        transform_start: parse_optional("transform_start", start)?,
        transform_end: parse_optional("transform_end", end)?,
    })
}

impl UserStore for Database {
    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let raw = self
            .conn()
            .query_row(
                "SELECT username, streak, lastCheckin, animal, transform_start, transform_end
                 FROM checkins WHERE username = ?1",
                params![username],
                raw_row,
            )
            .optional()?;
        raw.map(decode_row).transpose()
    }

    fn insert_first_checkin(
        &self,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO checkins (username, streak, lastCheckin) VALUES (?1, 1, ?2)",
            params![username, format_timestamp(at)],
        )?;
        Ok(())
    }

    fn record_checkin(
        &self,
        username: &str,
        streak: u32,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn().execute(
            "UPDATE checkins SET streak = ?1, lastCheckin = ?2 WHERE username = ?3",
            params![streak, format_timestamp(at), username],
        )?;
        Ok(())
    }

    fn set_transformation(
        &self,
        username: &str,
        animal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let changed = self.conn().execute(
            "UPDATE checkins SET animal = ?1, transform_start = ?2, transform_end = ?3
             WHERE username = ?4",
            params![animal, format_timestamp(start), format_timestamp(end), username],
        )?;
        Ok(changed)
    }

    fn clear_transformation(
        &self,
        username: &str,
        end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let changed = self.conn().execute(
            "UPDATE checkins SET animal = NULL, transform_start = NULL, transform_end = NULL
             WHERE username = ?1 AND transform_end = ?2",
            params![username, format_timestamp(end)],
        )?;
        Ok(changed)
    }

    fn animal_for(&self, username: &str) -> Result<Option<String>, DatabaseError> {
        let animal = self
            .conn()
            .query_row(
                "SELECT animal FROM checkins WHERE username = ?1",
                params![username],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(animal.flatten())
    }

    fn active_transformations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveTransformation>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT username, animal, transform_end FROM checkins
             WHERE transform_end > ?1 ORDER BY transform_end",
        )?;
        let rows = stmt.query_map(params![format_timestamp(now)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut active = Vec::new();
        for row in rows {
            let (username, animal, end) = row?;
            active.push(ActiveTransformation {
                username,
                animal,
                transform_end: parse_timestamp("transform_end", &end)?,
            });
        }
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_checkin_creates_row() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_user("alice").unwrap().is_none());

        db.insert_first_checkin("alice", t0()).unwrap();
        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.streak, 1);
        assert_eq!(user.last_checkin, Some(t0()));
        assert!(user.animal.is_none());
        assert!(user.transform_end.is_none());
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("Alice", t0()).unwrap();
        assert!(db.get_user("alice").unwrap().is_none());
        assert!(db.get_user("Alice").unwrap().is_some());
    }

    #[test]
    fn duplicate_first_checkin_fails() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("alice", t0()).unwrap();
        assert!(db.insert_first_checkin("alice", t0()).is_err());
    }

    #[test]
    fn record_checkin_updates_streak() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("alice", t0()).unwrap();
        let later = t0() + Duration::hours(25);
        db.record_checkin("alice", 2, later).unwrap();

        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.streak, 2);
        assert_eq!(user.last_checkin, Some(later));
    }

    #[test]
    fn transformation_set_and_clear() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("bob", t0()).unwrap();
        let end = t0() + Duration::minutes(30);

        assert_eq!(db.set_transformation("bob", "otter", t0(), end).unwrap(), 1);
        assert_eq!(db.animal_for("bob").unwrap().as_deref(), Some("otter"));
        let user = db.get_user("bob").unwrap().unwrap();
        assert_eq!(user.transform_start, Some(t0()));
        assert_eq!(user.transform_end, Some(end));

        assert_eq!(db.clear_transformation("bob", end).unwrap(), 1);
        let user = db.get_user("bob").unwrap().unwrap();
        assert!(user.animal.is_none());
        assert!(user.transform_start.is_none());
        assert!(user.transform_end.is_none());
        assert_eq!(user.streak, 1);
    }

    #[test]
    fn clear_skips_a_replaced_transformation() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("bob", t0()).unwrap();
        let old_end = t0() + Duration::minutes(2);
        let new_end = t0() + Duration::hours(3);
        db.set_transformation("bob", "otter", t0(), old_end).unwrap();
        db.set_transformation("bob", "fox", old_end, new_end).unwrap();

        assert_eq!(db.clear_transformation("bob", old_end).unwrap(), 0);
        let user = db.get_user("bob").unwrap().unwrap();
        assert_eq!(user.animal.as_deref(), Some("fox"));
        assert_eq!(user.transform_end, Some(new_end));

        assert_eq!(db.clear_transformation("bob", new_end).unwrap(), 1);
        assert!(db.animal_for("bob").unwrap().is_none());
    }

    #[test]
    fn transformation_without_row_changes_nothing() {
        let db = Database::open_memory().unwrap();
        let end = t0() + Duration::minutes(30);
        assert_eq!(db.set_transformation("ghost", "otter", t0(), end).unwrap(), 0);
        assert!(db.get_user("ghost").unwrap().is_none());
        assert!(db.animal_for("ghost").unwrap().is_none());
    }

    #[test]
    fn active_transformations_filters_by_end() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("future", t0()).unwrap();
        db.insert_first_checkin("past", t0()).unwrap();
        db.insert_first_checkin("plain", t0()).unwrap();
        db.set_transformation("future", "fox", t0(), t0() + Duration::hours(2))
            .unwrap();
        db.set_transformation("past", "owl", t0() - Duration::hours(2), t0())
            .unwrap();

        let active = db.active_transformations(t0()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].username, "future");
        assert_eq!(active[0].animal.as_deref(), Some("fox"));
        assert_eq!(active[0].transform_end, t0() + Duration::hours(2));
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO checkins (username, streak, lastCheckin) VALUES ('x', 1, 'yesterday')",
                [],
            )
            .unwrap();
        let err = db.get_user("x").unwrap_err();
        assert!(matches!(err, DatabaseError::Corrupt { .. }));
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streakbot.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_first_checkin("alice", t0()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_user("alice").unwrap().unwrap().streak, 1);
        assert_eq!(db.all_users().unwrap().len(), 1);
    }

    #[test]
    fn timestamps_use_fixed_width_format() {
        assert_eq!(format_timestamp(t0()), "2024-05-01T12:00:00.000Z");
    }
}
