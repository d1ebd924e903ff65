pub mod config;
pub mod run;
pub mod sweep;
pub mod transformed;
pub mod user;

use streakbot_core::error::Result;
use streakbot_core::{Config, Database};

/// Load the config and open the database it points at.
pub(crate) fn open_store() -> Result<(Config, Database)> {
    let config = Config::load()?;
    let db = Database::open(config.database_file()?)?;
    Ok((config, db))
}
