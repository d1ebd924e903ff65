//! Store double with switchable failures.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::storage::{ActiveTransformation, Database, UserRecord, UserStore};

/// An in-memory [`Database`] whose reads and writes can be made to fail.
pub struct FlakyStore {
    inner: Database,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: Database::open_memory().unwrap(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), DatabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryFailed("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), DatabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::Locked);
        }
        Ok(())
    }
}

impl UserStore for FlakyStore {
    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.check_read()?;
        self.inner.get_user(username)
    }

    fn insert_first_checkin(&self, username: &str, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.inner.insert_first_checkin(username, at)
    }

    fn record_checkin(
        &self,
        username: &str,
        streak: u32,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.inner.record_checkin(username, streak, at)
    }

    fn set_transformation(
        &self,
        username: &str,
        animal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        self.check_write()?;
        self.inner.set_transformation(username, animal, start, end)
    }

    fn clear_transformation(
        &self,
        username: &str,
        end: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        self.check_write()?;
        self.inner.clear_transformation(username, end)
    }

    fn animal_for(&self, username: &str) -> Result<Option<String>, DatabaseError> {
        self.check_read()?;
        self.inner.animal_for(username)
    }

    fn active_transformations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveTransformation>, DatabaseError> {
        self.check_read()?;
        self.inner.active_transformations(now)
    }
}
