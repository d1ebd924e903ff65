use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "streakbot", version, about = "Check-in streak and transformation bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot, reading `<user>: <message>` lines from stdin
    Run {
        /// Seed the transformation roller for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Inspect stored users
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Inspect active transformations
    Transformed {
        #[command(subcommand)]
        action: commands::transformed::TransformedAction,
    },
    /// Clear every expired transformation in the database
    Sweep,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr; stdout carries the bot's replies.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("streakbot=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { seed } => commands::run::run(seed),
        Commands::User { action } => commands::user::run(action),
        Commands::Transformed { action } => commands::transformed::run(action),
        Commands::Sweep => commands::sweep::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
