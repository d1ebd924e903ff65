//! Best-effort on-screen notifications.
//!
//! The engine calls an [`Overlay`] after an accepted check-in and ignores the
//! result apart from logging it. Implementations must return promptly; anything
//! slow belongs on a background task owned by the implementation.

use tracing::info;

pub type OverlayResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub trait Overlay: Send + Sync {
    /// Identifier used in log lines.
    fn name(&self) -> &str;

    /// Called after a check-in was stored.
    fn notify_checkin(&self, _username: &str, _streak: u32) -> OverlayResult {
        Ok(()) // default no-op
    }
}

/// Does nothing. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOverlay;

impl Overlay for NoopOverlay {
    fn name(&self) -> &str {
        "noop"
    }
}

/// Emits a tracing event per check-in, for streams that scrape the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOverlay;

impl Overlay for LogOverlay {
    fn name(&self) -> &str {
        "log"
    }

    fn notify_checkin(&self, username: &str, streak: u32) -> OverlayResult {
        info!(target: "streakbot::overlay", username, streak, "{username} has checked in!");
        Ok(())
    }
}

/// Pick the overlay for a config toggle.
pub fn from_enabled(enabled: bool) -> std::sync::Arc<dyn Overlay> {
    if enabled {
        std::sync::Arc::new(LogOverlay)
    } else {
        std::sync::Arc::new(NoopOverlay)
    }
}
