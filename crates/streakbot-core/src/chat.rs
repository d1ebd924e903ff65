//! Chat-facing surface: inbound events, command parsing, outbound replies.
//!
//! The network side lives outside this crate. Whatever reads the chat turns
//! each message into a [`ChatEvent`] and hands it to a [`Dispatcher`], which
//! answers through a [`ChatSink`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{Reply, StateEngine};
use crate::error::ChatError;

/// A recognized chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// `!checkin`
    Checkin,
    /// `!tf`
    Transform,
}

impl Command {
    /// Parse a chat message. Surrounding whitespace and case are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "!checkin" => Some(Command::Checkin),
            "!tf" => Some(Command::Transform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Checkin => "!checkin",
            Command::Transform => "!tf",
        }
    }
}

/// One chat message as delivered by the chat connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Channel the message arrived in; replies go back there.
    pub target: String,
    /// Login name of the sender.
    pub username: String,
    /// Display name, when the chat supplies one.
    #[serde(default)]
    pub display_name: Option<String>,
    pub text: String,
    /// Message was sent by the bot itself.
    #[serde(default)]
    pub is_self: bool,
    pub at: DateTime<Utc>,
}

impl ChatEvent {
    pub fn new(
        target: impl Into<String>,
        username: impl Into<String>,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.into(),
            username: username.into(),
            display_name: None,
            text: text.into(),
            is_self: false,
            at,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn from_self(mut self) -> Self {
        self.is_self = true;
        self
    }

    /// Name the user is stored and addressed under: the display name when
    /// present and non-empty, otherwise the login name.
    pub fn identity(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Outbound half of the chat connection.
pub trait ChatSink: Send + Sync {
    fn send(&self, target: &str, text: &str) -> Result<(), ChatError>;
}

/// Routes chat events to the engine and replies to the sink.
///
/// Call [`dispatch`](Self::dispatch) for one event at a time; each call runs to
/// completion, including its storage round trip, before the next.
pub struct Dispatcher {
    engine: Arc<StateEngine>,
    sink: Arc<dyn ChatSink>,
}

impl Dispatcher {
    pub fn new(engine: Arc<StateEngine>, sink: Arc<dyn ChatSink>) -> Self {
        Self { engine, sink }
    }

    pub fn engine(&self) -> &Arc<StateEngine> {
        &self.engine
    }

    /// Handle one chat message. Returns the reply that was sent, if any.
    ///
    /// Own messages and unknown commands get no reply.
    pub fn dispatch(&self, event: &ChatEvent) -> Option<Reply> {
        if event.is_self {
            return None;
        }

        let Some(command) = Command::parse(&event.text) else {
            debug!(text = %event.text.trim(), "Unknown command");
            return None;
        };

        let username = event.identity();
        let reply = self.engine.execute(command, username, event.at);

        if let Err(e) = self.sink.send(&event.target, &reply.text) {
            warn!(target_channel = %event.target, error = %e, "failed to deliver reply");
        }
        info!(
            command = command.as_str(),
            username,
            response = %reply.text,
            "Executed command"
        );
        Some(reply)
    }
}
