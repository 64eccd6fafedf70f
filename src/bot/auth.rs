//! Who may run privileged commands.
//!
//! An address is privileged when it is present in the protocol client's
//! roster and is not itself one of the bot's rooms. The roster is consulted
//! on every check; nothing is cached, so removing a contact revokes access
//! immediately.
use crate::protocol::{Jid, Roster};

use super::commands::{CommandContext, CommandHandler, CommandResult};
use super::rooms::RoomMembership;

#[derive(Debug, Clone, Copy)]
pub struct AuthorizationGate<'a> {
    rooms: &'a RoomMembership,
    roster: &'a Roster,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(rooms: &'a RoomMembership, roster: &'a Roster) -> Self {
        Self { rooms, roster }
    }

    /// Decision rule applied to the bare form of `jid`.
    pub fn is_authorized(&self, jid: &Jid) -> bool {
        let bare = jid.bare();
        !self.rooms.is_room(&bare) && self.roster.contains(&bare)
    }

    /// Roster contacts that are neither rooms nor the bot itself.
    pub fn privileged_users(&self, bot: &Jid) -> Vec<Jid> {
        let bot = bot.bare();
        self.roster
            .items()
            .into_iter()
            .filter(|j| *j != bot && !self.rooms.is_room(j))
            .collect()
    }
}

/// A handler that only runs for privileged invokers.
pub struct Privileged<H> {
    name: String,
    inner: H,
}

/// Compose the authorization gate with `inner`.
pub fn privileged<H: CommandHandler>(name: &str, inner: H) -> Privileged<H> {
    Privileged {
        name: name.to_string(),
        inner,
    }
}

impl<H: CommandHandler> CommandHandler for Privileged<H> {
    fn call(&self, ctx: &CommandContext<'_>, args: &[String]) -> CommandResult {
        let invoker = ctx.message.from.bare();
        if ctx.gate().is_authorized(&invoker) {
            return self.inner.call(ctx, args);
        }
        sec_log!("ignoring command {}, invalid user {}", self.name, invoker);
        Ok(None)
    }
}
