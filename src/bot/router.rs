//! Message classification and command dispatch.
//!
//! Every inbound message ends up in exactly one [`Route`]:
//!
//! 1. Room invitation / MUC user extension → [`Route::JoinTrigger`]
//! 2. Group chat echo of the bot's own nickname → [`Route::SelfEcho`]
//! 3. Body starting with the command prefix (`!echo hi`) or addressed to the
//!    bot by name (`bot, echo hi` / `bot: echo hi`) → [`Route::Command`]
//! 4. Anything else → [`Route::Ignore`]
//!
//! Unknown command names are not errors; they produce no reply.
use log::{debug, info, warn};

use crate::logutil::format_args_for_log;
use crate::protocol::{Jid, Message, MessageType, Outgoing, NS_CONFERENCE};

use super::commands::{CommandContext, CommandRegistry};
use super::rooms::RoomMembership;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    JoinTrigger { room: String, server: String },
    SelfEcho,
    Command(ParsedCommand),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    prefix: char,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new(crate::validation::DEFAULT_COMMAND_PREFIX)
    }
}

impl MessageRouter {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Decide what to do with `msg`. `resource` is the bot's session resource label.
    pub fn classify(&self, msg: &Message, rooms: &RoomMembership, resource: &str) -> Route {
        if msg.is_membership_control() {
            return match join_target(msg) {
                Some((room, server)) => Route::JoinTrigger { room, server },
                None => {
                    debug!("membership control from {} without a room address", msg.from);
                    Route::Ignore
                }
            };
        }

        let mut names = vec![resource];
        if msg.kind == MessageType::GroupChat {
            let room_id = msg.from.bare_str();
            if let Some(nick) = rooms.resource(&room_id) {
                if msg.from.resource() == Some(nick) {
                    return Route::SelfEcho;
                }
                // Accept being addressed by the in-room nickname too (e.g. "bot_: help").
                if nick != resource {
                    names.push(nick);
                }
            }
        }

        let Some(body) = msg.body.as_deref() else {
            return Route::Ignore;
        };
        match self.parse(body, &names) {
            Some(cmd) => Route::Command(cmd),
            None => Route::Ignore,
        }
    }

    /// Parse a command out of `body`, or `None` when it is ordinary chat.
    pub fn parse(&self, body: &str, names: &[&str]) -> Option<ParsedCommand> {
        let tokens: Vec<&str> = if let Some(rest) = body.strip_prefix(self.prefix) {
            // "! echo" has an empty command name
            if rest.starts_with(char::is_whitespace) {
                return None;
            }
            rest.split_whitespace().collect()
        } else if names.iter().any(|n| addressed_to(body, n)) {
            body.split_whitespace().skip(1).collect()
        } else {
            return None;
        };
        let (name, args) = tokens.split_first()?;
        if name.is_empty() {
            return None;
        }
        Some(ParsedCommand {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// Run the command and build the reply, if any.
    pub fn dispatch(
        &self,
        cmd: &ParsedCommand,
        registry: &CommandRegistry,
        ctx: &CommandContext<'_>,
    ) -> Option<Outgoing> {
        let handler = registry.lookup(&cmd.name)?;
        info!(
            "received command {} with arguments {}",
            cmd.name,
            format_args_for_log(&cmd.args)
        );
        let body = match handler.call(ctx, &cmd.args) {
            Ok(Some(reply)) if !reply.is_empty() => reply,
            Ok(_) => return None,
            Err(e) => {
                warn!("command {} from {} failed: {}", cmd.name, ctx.message.from, e);
                format!("error: {}", e)
            }
        };
        Some(Outgoing::Message {
            to: reply_target(ctx.message),
            body,
            kind: ctx.message.kind,
            subject: None,
        })
    }
}

/// Where a reply to `msg` goes: the sender, or the room itself for group chat.
pub fn reply_target(msg: &Message) -> Jid {
    if msg.kind == MessageType::GroupChat {
        msg.from.bare()
    } else {
        msg.from.clone()
    }
}

fn addressed_to(body: &str, name: &str) -> bool {
    !name.is_empty()
        && body
            .strip_prefix(name)
            .map_or(false, |rest| rest.starts_with(", ") || rest.starts_with(": "))
}

/// Room and server for a membership control message. Direct invitations
/// name the room in a `jid` attribute; otherwise the sender is the room.
fn join_target(msg: &Message) -> Option<(String, String)> {
    let invited = msg
        .children
        .iter()
        .filter(|c| c.has_namespace(NS_CONFERENCE))
        .find_map(|c| c.attr("jid"))
        .and_then(|j| j.parse::<Jid>().ok());
    let room = invited.unwrap_or_else(|| msg.from.bare());
    let node = room.node()?;
    Some((node.to_string(), room.domain().to_string()))
}
