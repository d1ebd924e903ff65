use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;
use streakbot_core::{remaining_time, UserStore};

#[derive(Subcommand)]
pub enum TransformedAction {
    /// List transformations that have not ended yet
    List,
}

#[derive(Serialize)]
struct Row {
    username: String,
    animal: Option<String>,
    transform_end: chrono::DateTime<Utc>,
    remaining: String,
}

pub fn run(action: TransformedAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, db) = super::open_store()?;

    match action {
        TransformedAction::List => {
            let now = Utc::now();
            let rows: Vec<Row> = db
                .active_transformations(now)?
                .into_iter()
                .map(|t| Row {
                    remaining: remaining_time(now, t.transform_end),
                    username: t.username,
                    animal: t.animal,
                    transform_end: t.transform_end,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
