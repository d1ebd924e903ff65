//! Periodic eviction of expired transformations.
//!
//! Each tick removes expired entries from the working set first, then clears
//! the matching rows in the store. A row is only cleared while it still holds
//! the evicted end time, so a `!tf` that lands between the two steps keeps its
//! new transformation. A failed clear is logged and not retried;
//! the row keeps a `transform_end` in the past, which the startup load skips,
//! so the views agree again after the next restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::engine::StateEngine;
use crate::storage::UserStore;
use crate::transformed::TransformedUsers;

/// Default period between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Users removed from the working set.
    pub evicted: Vec<String>,
    /// Evicted users whose stored fields could not be cleared.
    pub failed: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }
}

pub struct ExpirySweeper {
    store: Arc<dyn UserStore>,
    transformed: TransformedUsers,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn UserStore>, transformed: TransformedUsers) -> Self {
        Self { store, transformed }
    }

    /// A sweeper over the same store and working set as `engine`.
    pub fn for_engine(engine: &StateEngine) -> Self {
        Self::new(Arc::clone(engine.store()), engine.transformed().clone())
    }

    /// Evict every transformation that ended at or before `now`.
    pub fn tick(&self, now: DateTime<Utc>) -> SweepReport {
        let mut expired = self.transformed.take_expired(now);
        expired.sort();

        let mut report = SweepReport::default();
        for (username, end) in expired {
            match self.store.clear_transformation(&username, end) {
                Ok(0) => {
                    debug!(username = %username, end = %end, "stored transformation already replaced");
                }
                Ok(_) => {
                    debug!(username = %username, end = %end, "transformation expired");
                }
                Err(e) => {
                    error!(username = %username, error = %e, "failed to clear expired transformation");
                    report.failed.push(username.clone());
                }
            }
            report.evicted.push(username);
        }
        report
    }

    /// Run [`tick`](Self::tick) every `period` on the tokio runtime.
    ///
    /// Store work runs on the blocking pool. The task runs until aborted.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        let sweeper = Arc::new(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            info!(period_secs = period.as_secs_f64(), "expiry sweeper started");
            loop {
                interval.tick().await;
                let sweeper = Arc::clone(&sweeper);
                match tokio::task::spawn_blocking(move || sweeper.tick(Utc::now())).await {
                    Ok(report) if !report.is_empty() => {
                        info!(
                            evicted = report.evicted.len(),
                            failed = report.failed.len(),
                            "expired transformations swept"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "sweep task panicked"),
                }
            }
        })
    }
}
