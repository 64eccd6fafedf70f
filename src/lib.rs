//! # Mucbot - Command Bot for Multi-User Chat
//!
//! Mucbot is the command layer of a chat bot that lives on an XMPP-style
//! network. It logs in as one account, joins multi-user rooms, answers
//! commands typed in rooms or private chat and lets a small set of trusted
//! users run privileged commands.
//!
//! ## Features
//!
//! - **Command Dispatch**: `!name args` or `botname: name args`, with runtime registration
//! - **Room Membership**: Joins and leaves rooms, resolving nickname collisions by appending `_`
//! - **Invitations**: Follows room invitations and direct invitations automatically
//! - **Authorization**: Privileged commands gated on the roster; rooms are never privileged
//! - **Subscription Handshake**: Master users are subscribed and approved at startup
//! - **Keep-Alive**: Periodic whitespace ping while the session is idle
//! - **Async Design**: Built with Tokio; all bot state owned by a single event loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mucbot::bot::Bot;
//! use mucbot::config::Config;
//! use mucbot::protocol::ChannelClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load("config.toml").await?;
//!
//!     // Wire the bot to a protocol client and start serving
//!     let (client, _outgoing) = ChannelClient::channel();
//!     let (_events_tx, events) = tokio::sync::mpsc::unbounded_channel();
//!     let mut bot = Bot::from_config(&config, client)?;
//!     bot.start(events).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - Bot core: router, commands, rooms, subscriptions, event loop
//! - [`protocol`] - Addresses, stanzas, roster and the protocol client seam
//! - [`identity`] - The bot's own address, credentials and resource label
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Input validation for names, prefixes and room ids
//! - [`error`] - Error types surfaced by the public API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Bot           │ ← Core application logic
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Protocol      │ ← Session, stanzas, roster
//! │   Client        │
//! └─────────────────┘
//! ```
//!
//! See `src/main.rs` for a complete application wiring the bot to a console
//! transport.

pub mod bot;
pub mod config;
pub mod error;
pub mod identity;
pub mod logutil;
pub mod protocol;
pub mod validation;

#[cfg(feature = "api-reexports")]
pub use bot::{Bot, BotHooks, BotOptions, CommandRegistry, RoomJoinCoordinator};
#[cfg(feature = "api-reexports")]
pub use error::{BotError, BotResult};
