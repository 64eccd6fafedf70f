//! Command registry and the built-in commands.
//!
//! A command is a name bound to a [`CommandHandler`]. Handlers receive a
//! [`CommandContext`] (the originating message plus read-only views of bot
//! state) and the positional arguments, and return an optional reply.
//! Registering a name that already exists replaces the previous handler.
use std::collections::HashMap;
use std::fmt;

use crate::error::BotResult;
use crate::identity::BotIdentity;
use crate::protocol::{Message, Roster};
use crate::validation::validate_command_name;

use super::auth::{privileged, AuthorizationGate};
use super::rooms::RoomMembership;

/// Failure reported by a handler. The router turns it into an `error: ...` reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CommandError(pub String);

impl From<&str> for CommandError {
    fn from(s: &str) -> Self {
        CommandError(s.to_string())
    }
}

impl From<String> for CommandError {
    fn from(s: String) -> Self {
        CommandError(s)
    }
}

pub type CommandResult = Result<Option<String>, CommandError>;

/// Everything a handler may look at while running.
pub struct CommandContext<'a> {
    pub message: &'a Message,
    pub identity: &'a BotIdentity,
    pub rooms: &'a RoomMembership,
    pub roster: &'a Roster,
    pub registry: &'a CommandRegistry,
}

impl<'a> CommandContext<'a> {
    pub fn gate(&self) -> AuthorizationGate<'a> {
        AuthorizationGate::new(self.rooms, self.roster)
    }
}

pub trait CommandHandler: Send + Sync {
    fn call(&self, ctx: &CommandContext<'_>, args: &[String]) -> CommandResult;
}

/// Adapter so plain closures can be registered.
pub struct FnHandler<F>(pub F);

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&CommandContext<'_>, &[String]) -> CommandResult + Send + Sync,
{
    fn call(&self, ctx: &CommandContext<'_>, args: &[String]) -> CommandResult {
        (self.0)(ctx, args)
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`builtin`] commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::install(&mut registry);
        registry
    }

    /// Install or replace `name`. Usable immediately.
    pub fn register<H>(&mut self, name: &str, handler: H) -> BotResult<()>
    where
        H: CommandHandler + 'static,
    {
        let name = validate_command_name(name)?;
        self.commands.insert(name, Box::new(handler));
        Ok(())
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F) -> BotResult<()>
    where
        F: Fn(&CommandContext<'_>, &[String]) -> CommandResult + Send + Sync + 'static,
    {
        self.register(name, FnHandler(f))
    }

    /// Register a closure behind the authorization gate.
    pub fn register_privileged_fn<F>(&mut self, name: &str, f: F) -> BotResult<()>
    where
        F: Fn(&CommandContext<'_>, &[String]) -> CommandResult + Send + Sync + 'static,
    {
        self.register(name, privileged(name, FnHandler(f)))
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.commands.get(name).map(|h| h.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

/// Commands every bot ships with.
///
/// - `echo <text...>` - arguments joined by a space
/// - `whoami` - the sender's full address
/// - `help` - registered command names
/// - `rooms` (privileged) - rooms the bot is in
/// - `users` (privileged) - privileged users known to the roster
pub mod builtin {
    use super::*;

    pub fn install(registry: &mut CommandRegistry) {
        let installs = [
            registry.register_fn("echo", echo),
            registry.register_fn("whoami", whoami),
            registry.register_fn("help", help),
            registry.register_privileged_fn("rooms", rooms),
            registry.register_privileged_fn("users", users),
        ];
        debug_assert!(installs.iter().all(Result::is_ok));
    }

    pub fn echo(_ctx: &CommandContext<'_>, args: &[String]) -> CommandResult {
        Ok(Some(args.join(" ")))
    }

    pub fn whoami(ctx: &CommandContext<'_>, _args: &[String]) -> CommandResult {
        Ok(Some(format!("You are {}", ctx.message.from)))
    }

    pub fn help(ctx: &CommandContext<'_>, _args: &[String]) -> CommandResult {
        Ok(Some(format!("Commands: {}", ctx.registry.names().join(", "))))
    }

    pub fn rooms(ctx: &CommandContext<'_>, _args: &[String]) -> CommandResult {
        let ids = ctx.rooms.room_ids();
        if ids.is_empty() {
            return Ok(Some("Not in any rooms".to_string()));
        }
        Ok(Some(ids.join(", ")))
    }

    pub fn users(ctx: &CommandContext<'_>, _args: &[String]) -> CommandResult {
        let users: Vec<String> = ctx
            .gate()
            .privileged_users(ctx.identity.jid())
            .iter()
            .map(|j| j.to_string())
            .collect();
        if users.is_empty() {
            return Ok(Some("No users registered".to_string()));
        }
        Ok(Some(users.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Jid, Message};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn identity() -> BotIdentity {
        let jid: Jid = "bot@example.com".parse().unwrap();
        BotIdentity::new(jid, "pw", Some("bot"), "x", &mut StdRng::seed_from_u64(0))
    }

    fn run(
        registry: &CommandRegistry,
        roster: &Roster,
        rooms: &RoomMembership,
        from: &str,
        name: &str,
        args: &[&str],
    ) -> CommandResult {
        let identity = identity();
        let message = Message::chat(from.parse().unwrap(), "unused");
        let ctx = CommandContext {
            message: &message,
            identity: &identity,
            rooms,
            roster,
            registry,
        };
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        registry.lookup(name).expect("registered").call(&ctx, &args)
    }

    #[test]
    fn reregistering_replaces_handler() {
        let mut registry = CommandRegistry::new();
        registry.register_fn("ping", |_, _| Ok(Some("one".into()))).unwrap();
        registry.register_fn("ping", |_, _| Ok(Some("two".into()))).unwrap();
        assert_eq!(registry.len(), 1);
        let out = run(&registry, &Roster::new(), &RoomMembership::new(), "a@example.com/x", "ping", &[]);
        assert_eq!(out, Ok(Some("two".into())));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut registry = CommandRegistry::new();
        assert!(registry.register_fn("", |_, _| Ok(None)).is_err());
        assert!(registry.register_fn("two words", |_, _| Ok(None)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn builtins_present() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["echo", "help", "rooms", "users", "whoami"]);
    }

    #[test]
    fn echo_and_whoami() {
        let registry = CommandRegistry::with_builtins();
        let roster = Roster::new();
        let rooms = RoomMembership::new();
        assert_eq!(
            run(&registry, &roster, &rooms, "a@example.com/x", "echo", &["hello", "world"]),
            Ok(Some("hello world".into()))
        );
        assert_eq!(
            run(&registry, &roster, &rooms, "a@example.com/x", "whoami", &[]),
            Ok(Some("You are a@example.com/x".into()))
        );
    }

    #[test]
    fn rooms_requires_roster_membership() {
        let registry = CommandRegistry::with_builtins();
        let mut roster = Roster::new();
        let mut rooms = RoomMembership::new();
        rooms.insert("b@conf.example.com", "bot");
        rooms.insert("a@conf.example.com", "bot_");

        let denied = run(&registry, &roster, &rooms, "stranger@example.com/x", "rooms", &[]);
        assert_eq!(denied, Ok(None));

        roster.authorize(&"owner@example.com".parse().unwrap());
        let allowed = run(&registry, &roster, &rooms, "owner@example.com/x", "rooms", &[]);
        assert_eq!(allowed, Ok(Some("a@conf.example.com, b@conf.example.com".into())));
    }

    #[test]
    fn users_lists_privileged_contacts() {
        let registry = CommandRegistry::with_builtins();
        let mut roster = Roster::new();
        let mut rooms = RoomMembership::new();
        rooms.insert("lobby@conf.example.com", "bot");
        roster.authorize(&"owner@example.com".parse().unwrap());
        roster.authorize(&"lobby@conf.example.com".parse().unwrap());
        roster.authorize(&"bot@example.com".parse().unwrap());
        let out = run(&registry, &roster, &rooms, "owner@example.com/x", "users", &[]);
        assert_eq!(out, Ok(Some("owner@example.com".into())));
    }
}
