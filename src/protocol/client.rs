//! The seam between the bot core and whatever speaks the chat protocol.
//!
//! [`ProtocolClient`] is the only surface the core uses: open a session, push
//! outbound stanzas, and query/update the roster. [`ChannelClient`] is the
//! stock implementation; it hands every outbound stanza to a tokio channel so
//! an embedding transport (or a test) can drain them, the same way the
//! device writer task is fed from an unbounded queue.
use log::{debug, info};
use tokio::sync::mpsc;

use super::roster::Roster;
use super::stanza::Outgoing;
use crate::error::{BotError, BotResult};
use crate::identity::{BotIdentity, ServerAddress};

pub trait ProtocolClient {
    /// Open and authenticate the session.
    fn connect(&mut self, server: &ServerAddress, identity: &BotIdentity) -> BotResult<()>;

    /// Queue one stanza for sending. Never blocks.
    fn send(&mut self, stanza: Outgoing) -> BotResult<()>;

    fn roster(&self) -> &Roster;

    fn roster_mut(&mut self) -> &mut Roster;

    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);
}

/// Protocol client backed by an unbounded outbound channel and a local roster.
#[derive(Debug)]
pub struct ChannelClient {
    outgoing_tx: mpsc::UnboundedSender<Outgoing>,
    roster: Roster,
    connected: bool,
}

impl ChannelClient {
    pub fn new(outgoing_tx: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            outgoing_tx,
            roster: Roster::new(),
            connected: false,
        }
    }

    /// Convenience constructor returning the client and the receiving end of its outbound queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Seed the roster before connecting (e.g. from a transport that already fetched it).
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self
    }
}

impl ProtocolClient for ChannelClient {
    fn connect(&mut self, server: &ServerAddress, identity: &BotIdentity) -> BotResult<()> {
        if self.connected {
            return Ok(());
        }
        if self.outgoing_tx.is_closed() {
            return Err(BotError::ConnectionFailure(format!(
                "unable to connect to {}",
                server
            )));
        }
        info!("connected to {}", server);
        if identity.user().is_empty() || identity.password().is_empty() {
            return Err(BotError::AuthFailure(identity.jid().to_string()));
        }
        info!("authorized user {}", identity.user());
        self.connected = true;
        self.send(Outgoing::InitialPresence)
    }

    fn send(&mut self, stanza: Outgoing) -> BotResult<()> {
        if !self.connected {
            return Err(BotError::NotConnected);
        }
        debug!("outgoing stanza: {:?}", stanza);
        self.outgoing_tx
            .send(stanza)
            .map_err(|_| BotError::ClientClosed)
    }

    fn roster(&self) -> &Roster {
        &self.roster
    }

    fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    fn is_connected(&self) -> bool {
        self.connected && !self.outgoing_tx.is_closed()
    }

    fn disconnect(&mut self) {
        if self.connected {
            debug!("protocol client disconnected");
        }
        self.connected = false;
    }
}
