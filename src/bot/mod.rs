//! # Bot Core Module
//!
//! Everything between the protocol client and user-supplied commands.
//!
//! ## Components
//!
//! - [`server`] - The [`Bot`] itself: lifecycle, event loop and public API
//! - [`router`] - Classifies inbound messages and dispatches commands
//! - [`commands`] - Command registry, handler trait and built-in commands
//! - [`auth`] - Roster-based authorization gate for privileged commands
//! - [`rooms`] - Room membership and the join state machine
//! - [`subscription`] - Subscription handshake with master users
//! - [`idle`] - Keep-alive job
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Bot            │ ← Owns all state, one event at a time
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Router         │ ← Join trigger / self echo / command / ignore
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Command        │ ← Handlers, optionally behind the gate
//! │  Registry       │
//! └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mucbot::bot::{Bot, BotOptions};
//! use mucbot::identity::{BotIdentity, ServerAddress};
//! use mucbot::protocol::ChannelClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let jid = "bot@example.com".parse()?;
//!     let identity = BotIdentity::new(jid, "secret", Some("bot"), "bot", &mut rand::thread_rng());
//!     let server = ServerAddress::for_jid(identity.jid());
//!     let (client, _outgoing) = ChannelClient::channel();
//!     let mut bot = Bot::new(identity, server, client, BotOptions::default());
//!     bot.connect()?;
//!     bot.join(&["lobby@conference.example.com"]);
//!     Ok(())
//! }
//! ```

// Security log helper: warnings under the "security" target.
macro_rules! sec_log {
    ($($arg:tt)*) => { log::warn!(target: "security", $($arg)*); };
}

pub mod auth;
pub mod commands;
pub mod idle;
pub mod rooms;
pub mod router;
pub mod server;
pub mod subscription;

pub use auth::{privileged, AuthorizationGate, Privileged};
pub use commands::{
    CommandContext, CommandError, CommandHandler, CommandRegistry, CommandResult, FnHandler,
};
pub use rooms::{JoinProgress, JoinState, RoomJoinCoordinator, RoomMembership};
pub use router::{MessageRouter, ParsedCommand, Route};
pub use server::{Bot, BotHooks, BotOptions, InternalMessage, NoHooks, ShutdownHandle};
pub use subscription::{PendingSubscriptions, SubscriptionAction};
