use std::sync::Arc;

use chrono::Utc;
use streakbot_core::{ExpirySweeper, TransformedUsers};

/// One sweep over every stored transformation, including rows a failed
/// background sweep left behind.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (_config, db) = super::open_store()?;

    let transformed = TransformedUsers::new();
    transformed.replace_all(
        db.all_users()?
            .into_iter()
            .filter_map(|user| user.transform_end.map(|end| (user.username, end))),
    );

    let report = ExpirySweeper::new(Arc::new(db), transformed).tick(Utc::now());
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.failed.is_empty() {
        return Err(format!("{} transformation(s) could not be cleared", report.failed.len()).into());
    }
    Ok(())
}
