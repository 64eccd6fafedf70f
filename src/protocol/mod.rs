//! # Protocol Client Boundary
//!
//! Everything the bot core knows about the chat protocol lives here:
//!
//! - [`jid`] - `node@domain/resource` addresses
//! - [`stanza`] - inbound [`Event`]s and [`Outgoing`] stanzas
//! - [`roster`] - the contact list used for authorization
//! - [`client`] - the [`ProtocolClient`] trait and the channel-backed [`ChannelClient`]
//!
//! Connection handling, TLS and XML encoding belong to the transport that
//! implements [`ProtocolClient`]; the core only sends and receives the
//! shallow types defined in this module.

pub mod client;
pub mod jid;
pub mod roster;
pub mod stanza;

pub use client::{ChannelClient, ProtocolClient};
pub use jid::Jid;
pub use roster::{Roster, RosterItem, Subscription};
pub use stanza::{
    Element, Event, Message, MessageType, Outgoing, Presence, PresenceType, ERROR_CODE_CONFLICT,
    NS_CONFERENCE, NS_MUC_USER,
};
