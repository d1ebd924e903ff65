//! # Streakbot Core Library
//!
//! Core logic for a chat bot that tracks daily check-in streaks and hands out
//! timed, randomly chosen animal transformations. The chat connection itself is
//! outside this crate; the `streakbot` CLI drives the same core from stdin.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite user table and TOML-based configuration
//! - **Engine**: Applies `!checkin` and `!tf` commands and builds the replies
//! - **Working set**: In-memory map of users with an active transformation
//! - **Sweeper**: Periodic task that evicts expired transformations
//! - **Bootstrap**: Refills the working set from storage at startup
//!
//! ## Key Components
//!
//! - [`StateEngine`]: Command handling
//! - [`Dispatcher`]: Routes chat events to the engine and replies to a [`ChatSink`]
//! - [`ExpirySweeper`]: Expiry loop
//! - [`Database`]: User record persistence
//! - [`Config`]: Application configuration management

pub mod animals;
pub mod bootstrap;
pub mod chat;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod storage;
pub mod sweeper;
pub mod timing;
pub mod transformed;

#[cfg(test)]
mod test_support;

pub use bootstrap::load_working_set;
pub use chat::{ChatEvent, ChatSink, Command, Dispatcher};
pub use engine::{Outcome, Reply, StateEngine};
pub use error::{ChatError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use overlay::Overlay;
pub use storage::{ActiveTransformation, Config, Database, UserRecord, UserStore};
pub use sweeper::{ExpirySweeper, SweepReport};
pub use timing::{is_checkin_eligible, remaining_time, TransformRoller};
pub use transformed::TransformedUsers;
