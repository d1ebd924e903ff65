//! Time rules for check-ins and transformations.
//!
//! Everything here is a pure function of the timestamps passed in, except the
//! [`TransformRoller`], which owns a seedable RNG so tests can pin its output.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::error::ValidationError;

/// Minimum time between two accepted check-ins. Elapsed time must exceed it.
pub const CHECKIN_COOLDOWN_HOURS: i64 = 24;

/// Shortest transformation, in minutes.
pub const MIN_TRANSFORM_MINUTES: i64 = 2;

/// Longest transformation, in minutes (one week).
pub const MAX_TRANSFORM_MINUTES: i64 = 7 * 24 * 60;

/// Whether a user whose last accepted check-in was `last_checkin` may check in at `now`.
///
/// Exactly 24 hours is not enough; the gap must be strictly longer.
pub fn is_checkin_eligible(now: DateTime<Utc>, last_checkin: Option<DateTime<Utc>>) -> bool {
    match last_checkin {
        None => true,
        Some(last) => now - last > Duration::hours(CHECKIN_COOLDOWN_HOURS),
    }
}

/// Human-readable time left until `end`, or `"none"` once it has passed.
///
/// Days, hours and minutes appear only when non-zero; seconds always appear.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use streakbot_core::timing::remaining_time;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(remaining_time(now, now + Duration::seconds(61)), "1 minute, 1 second");
/// assert_eq!(remaining_time(now, now), "none");
/// ```
pub fn remaining_time(now: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let remaining_ms = (end - now).num_milliseconds();
    if remaining_ms <= 0 {
        return "none".to_string();
    }

    let seconds = (remaining_ms / 1000) % 60;
    let minutes = (remaining_ms / (1000 * 60)) % 60;
    let hours = (remaining_ms / (1000 * 60 * 60)) % 24;
    let days = remaining_ms / (1000 * 60 * 60 * 24);

    let mut out = String::new();
    for (value, unit) in [(days, "day"), (hours, "hour"), (minutes, "minute")] {
        if value > 0 {
            let plural = if value > 1 { "s" } else { "" };
            out.push_str(&format!("{value} {unit}{plural}, "));
        }
    }
    let plural = if seconds != 1 { "s" } else { "" };
    out.push_str(&format!("{seconds} second{plural}"));
    out
}

/// Random draws for new transformations.
pub struct TransformRoller {
    rng: Mutex<Mcg128Xsl64>,
}

impl TransformRoller {
    /// A roller seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(Mcg128Xsl64::from_entropy()),
        }
    }

    /// A reproducible roller.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(Mcg128Xsl64::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut Mcg128Xsl64) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// A whole number of minutes drawn uniformly from
    /// [`MIN_TRANSFORM_MINUTES`, `MAX_TRANSFORM_MINUTES`].
    pub fn duration(&self) -> Duration {
        let minutes =
            self.with_rng(|rng| rng.gen_range(MIN_TRANSFORM_MINUTES..=MAX_TRANSFORM_MINUTES));
        Duration::minutes(minutes)
    }

    /// A label drawn uniformly from `labels`.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyCollection`] when `labels` is empty.
    pub fn animal<'a>(&self, labels: &'a [String]) -> Result<&'a str, ValidationError> {
        self.with_rng(|rng| labels.choose(rng))
            .map(String::as_str)
            .ok_or_else(|| ValidationError::EmptyCollection("transformation labels".into()))
    }
}

impl Default for TransformRoller {
    fn default() -> Self {
        Self::new()
    }
}
