mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, OverlayConfig};
pub use database::{ActiveTransformation, Database, UserRecord, UserStore};

use std::path::PathBuf;

/// Returns `~/.config/streakbot[-dev]/` based on STREAKBOT_ENV.
///
/// Set STREAKBOT_ENV=dev to use development data directory. The directory is
/// not created here.
pub fn data_dir_path() -> PathBuf {
    let env = std::env::var("STREAKBOT_ENV").ok();
    dir_for(dirs::home_dir(), env.as_deref())
}

fn dir_for(home: Option<PathBuf>, env: Option<&str>) -> PathBuf {
    let base_dir = home.unwrap_or_else(|| PathBuf::from(".")).join(".config");
    if env == Some("dev") {
        base_dir.join("streakbot-dev")
    } else {
        base_dir.join("streakbot")
    }
}
