use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use streakbot_core::overlay;
use streakbot_core::{
    load_working_set, ChatError, ChatEvent, ChatSink, Dispatcher, ExpirySweeper, StateEngine,
    TransformRoller, TransformedUsers, UserStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Prints replies as `[<target>] <text>`.
struct StdoutSink;

impl ChatSink for StdoutSink {
    fn send(&self, target: &str, text: &str) -> Result<(), ChatError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "[{target}] {text}")
            .and_then(|_| out.flush())
            .map_err(|e| ChatError::SendFailed {
                target: target.to_string(),
                message: e.to_string(),
            })
    }
}

/// Turn one input line of the form `<user>: <message>` into a chat event.
fn parse_line(channel: &str, line: &str, at: DateTime<Utc>) -> Option<ChatEvent> {
    let (user, text) = line.split_once(':')?;
    let user = user.trim();
    if user.is_empty() {
        return None;
    }
    Some(ChatEvent::new(channel, user, text.trim(), at))
}

pub fn run(seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(seed))
}

async fn serve(seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, db) = super::open_store()?;
    let store: Arc<dyn UserStore> = Arc::new(db);

    let transformed = TransformedUsers::new();
    load_working_set(store.as_ref(), &transformed, Utc::now());

    let mut engine = StateEngine::new(store, transformed, config.animals.clone())?
        .with_overlay(overlay::from_enabled(config.overlay.enabled));
    if let Some(seed) = seed {
        engine = engine.with_roller(TransformRoller::seeded(seed));
    }
    let engine = Arc::new(engine);

    let sweeper = ExpirySweeper::for_engine(&engine).spawn(config.sweep_interval());
    let dispatcher = Arc::new(Dispatcher::new(engine, Arc::new(StdoutSink)));
    info!(channel = %config.channel, "bot connected to stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_line(&config.channel, &line, Utc::now()) else {
            continue;
        };
        let dispatcher = Arc::clone(&dispatcher);
        tokio::task::spawn_blocking(move || dispatcher.dispatch(&event)).await?;
    }

    sweeper.abort();
    info!("input closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_and_message() {
        let at = Utc::now();
        let event = parse_line("#den", "alice: !checkin ", at).unwrap();
        assert_eq!(event.target, "#den");
        assert_eq!(event.username, "alice");
        assert_eq!(event.text, "!checkin");
        assert_eq!(event.at, at);
        assert!(!event.is_self);
    }

    #[test]
    fn keeps_colons_in_message() {
        let event = parse_line("#den", "bob: note: !tf", Utc::now()).unwrap();
        assert_eq!(event.username, "bob");
        assert_eq!(event.text, "note: !tf");
    }

    #[test]
    fn rejects_lines_without_user() {
        assert!(parse_line("#den", "!checkin", Utc::now()).is_none());
        assert!(parse_line("#den", "  : !checkin", Utc::now()).is_none());
        assert!(parse_line("#den", "", Utc::now()).is_none());
    }
}
