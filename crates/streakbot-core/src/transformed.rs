//! In-memory working set of active transformations.
//!
//! A cheap-to-clone handle over `username -> transform_end`. The engine, the
//! sweeper and the bootstrap loader share one instance. Every method takes the
//! lock for a single map operation only; callers never hold it across storage I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct TransformedUsers {
    inner: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl TransformedUsers {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// End time of the user's transformation if it is still running at `now`.
    ///
    /// An entry whose end has passed counts as expired even before the sweeper
    /// removes it.
    pub fn active_until(&self, username: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.map().get(username).copied().filter(|end| *end > now)
    }

    pub fn insert(&self, username: impl Into<String>, end: DateTime<Utc>) {
        self.map().insert(username.into(), end);
    }

    /// Remove and return every entry whose end is at or before `now`.
    pub fn take_expired(&self, now: DateTime<Utc>) -> Vec<(String, DateTime<Utc>)> {
        let mut map = self.map();
        let expired: Vec<String> = map
            .iter()
            .filter(|(_, end)| **end <= now)
            .map(|(name, _)| name.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|name| map.remove(&name).map(|end| (name, end)))
            .collect()
    }

    /// Replace the whole working set.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (String, DateTime<Utc>)>) {
        let mut map = self.map();
        map.clear();
        map.extend(entries);
    }

    /// A copy of the current entries, sorted by username.
    pub fn snapshot(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut entries: Vec<_> = self
            .map()
            .iter()
            .map(|(name, end)| (name.clone(), *end))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.map().contains_key(username)
    }
}
