use clap::Subcommand;
use streakbot_core::UserStore;

#[derive(Subcommand)]
pub enum UserAction {
    /// Show one user's record
    Show {
        /// Name the user checks in under
        name: String,
    },
    /// List every stored user
    List,
}

pub fn run(action: UserAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, db) = super::open_store()?;

    match action {
        UserAction::Show { name } => match db.get_user(&name)? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => {
                eprintln!("unknown user: {name}");
                std::process::exit(1);
            }
        },
        UserAction::List => {
            let users = db.all_users()?;
            println!("{}", serde_json::to_string_pretty(&users)?);
        }
    }
    Ok(())
}
