//! Command handling for check-ins and transformations.
//!
//! The [`StateEngine`] owns the working set of active transformations and
//! applies each command against the durable store. Every command produces a
//! [`Reply`]; storage failures are logged and turned into a generic message,
//! so the engine keeps serving the next command.
//!
//! ## Flow
//!
//! ```text
//! !checkin: lookup -> (insert | eligible? update : reject) -> overlay
//! !tf:      working set active? report : roll -> store -> working set
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chat::Command;
use crate::error::{CoreError, ValidationError};
use crate::overlay::{NoopOverlay, Overlay};
use crate::storage::UserStore;
use crate::timing::{is_checkin_eligible, remaining_time, TransformRoller};
use crate::transformed::TransformedUsers;

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    FirstCheckin,
    CheckedIn { streak: u32 },
    AlreadyCheckedIn,
    Transformed { animal: String, until: DateTime<Utc> },
    AlreadyTransformed { animal: String, until: DateTime<Utc> },
    Failed,
}

/// Result of one command: the outcome plus the chat text to send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub outcome: Outcome,
    pub text: String,
}

impl Reply {
    fn new(outcome: Outcome, text: String) -> Self {
        Self { outcome, text }
    }
}

pub struct StateEngine {
    store: Arc<dyn UserStore>,
    transformed: TransformedUsers,
    roller: TransformRoller,
    animals: Vec<String>,
    overlay: Arc<dyn Overlay>,
}

impl StateEngine {
    /// Create an engine over `store`, sharing `transformed` with the sweeper.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyCollection`] if `animals` has no usable label.
    pub fn new(
        store: Arc<dyn UserStore>,
        transformed: TransformedUsers,
        animals: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let animals: Vec<String> = animals
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if animals.is_empty() {
            return Err(ValidationError::EmptyCollection(
                "transformation labels".into(),
            ));
        }

        Ok(Self {
            store,
            transformed,
            roller: TransformRoller::new(),
            animals,
            overlay: Arc::new(NoopOverlay),
        })
    }

    /// Replace the random source, e.g. with [`TransformRoller::seeded`].
    pub fn with_roller(mut self, roller: TransformRoller) -> Self {
        self.roller = roller;
        self
    }

    pub fn with_overlay(mut self, overlay: Arc<dyn Overlay>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn transformed(&self) -> &TransformedUsers {
        &self.transformed
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn animals(&self) -> &[String] {
        &self.animals
    }

    /// Run a parsed command for `username`.
    pub fn execute(&self, command: Command, username: &str, now: DateTime<Utc>) -> Reply {
        match command {
            Command::Checkin => self.handle_checkin(username, now),
            Command::Transform => self.handle_transform(username, now),
        }
    }

    // ── Check-in ─────────────────────────────────────────────────────

    pub fn handle_checkin(&self, username: &str, now: DateTime<Utc>) -> Reply {
        match self.try_checkin(username, now) {
            Ok(reply) => reply,
            Err(e) => {
                error!(username, error = %e, "check-in failed");
                Reply::new(
                    Outcome::Failed,
                    format!("@{username}, an error occurred. Please try again later."),
                )
            }
        }
    }

    fn try_checkin(&self, username: &str, now: DateTime<Utc>) -> Result<Reply, CoreError> {
        let (reply, streak) = match self.store.get_user(username)? {
            None => {
                self.store.insert_first_checkin(username, now)?;
                let reply = Reply::new(
                    Outcome::FirstCheckin,
                    format!(
                        "@{username}, you have checked in for the first time! Your current streak is 1 day."
                    ),
                );
                (reply, 1)
            }
            Some(record) if is_checkin_eligible(now, record.last_checkin) => {
                let streak = record.streak.saturating_add(1);
                self.store.record_checkin(username, streak, now)?;
                let reply = Reply::new(
                    Outcome::CheckedIn { streak },
                    format!("@{username} has checked in! You're currently on a {streak} day streak."),
                );
                (reply, streak)
            }
            Some(_) => {
                return Ok(Reply::new(
                    Outcome::AlreadyCheckedIn,
                    format!(
                        "@{username}, you have already checked in today. Please try again later!"
                    ),
                ));
            }
        };

        info!(username, streak, "check-in accepted");
        self.notify_overlay(username, streak);
        Ok(reply)
    }

    fn notify_overlay(&self, username: &str, streak: u32) {
        if let Err(e) = self.overlay.notify_checkin(username, streak) {
            warn!(
                overlay = self.overlay.name(),
                username,
                error = %e,
                "overlay notification failed"
            );
        }
    }

    // ── Transformation ───────────────────────────────────────────────

    pub fn handle_transform(&self, username: &str, now: DateTime<Utc>) -> Reply {
        if let Some(until) = self.transformed.active_until(username, now) {
            return self.report_transformation(username, until, now);
        }

        match self.try_transform(username, now) {
            Ok(reply) => reply,
            Err(e) => {
                error!(username, error = %e, "transformation failed");
                Reply::new(Outcome::Failed, format!("@{username}, an error occurred."))
            }
        }
    }

    fn report_transformation(&self, username: &str, until: DateTime<Utc>, now: DateTime<Utc>) -> Reply {
        let animal = match self.store.animal_for(username) {
            Ok(Some(animal)) => animal,
            Ok(None) => "unknown".to_string(),
            Err(e) => {
                error!(username, error = %e, "failed to read transformation label");
                "unknown".to_string()
            }
        };
        let remaining = remaining_time(now, until);
        Reply::new(
            Outcome::AlreadyTransformed {
                animal: animal.clone(),
                until,
            },
            format!("@{username} is currently TF'd into a {animal} for {remaining}."),
        )
    }

    fn try_transform(&self, username: &str, now: DateTime<Utc>) -> Result<Reply, CoreError> {
        let animal = self.roller.animal(&self.animals)?.to_string();
        let until = now + self.roller.duration();
        if until <= now {
            return Err(ValidationError::InvalidTimeRange { start: now, end: until }.into());
        }

        let changed = self.store.set_transformation(username, &animal, now, until)?;
        if changed == 0 {
            // No check-in row to update. The working set still tracks the
            // transformation until it expires.
            warn!(username, "transformation for user without a check-in record was not stored");
        }
        self.transformed.insert(username, until);

        info!(username, animal = %animal, until = %until, "transformation started");
        let remaining = remaining_time(now, until);
        Ok(Reply::new(
            Outcome::Transformed {
                animal: animal.clone(),
                until,
            },
            format!("{username} has TF'd into a {animal} for the next {remaining}."),
        ))
    }
}
