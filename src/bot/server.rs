use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::commands::{CommandContext, CommandHandler, CommandRegistry, CommandResult};
use super::idle::{start_idle_job, IdleHandle};
use super::rooms::{JoinProgress, JoinState, RoomJoinCoordinator, RoomMembership};
use super::router::{MessageRouter, Route};
use super::subscription::{PendingSubscriptions, SubscriptionAction};
use crate::config::Config;
use crate::error::{BotError, BotResult};
use crate::identity::{BotIdentity, ServerAddress};
use crate::logutil::escape_log;
use crate::protocol::{
    Event, Jid, Message, MessageType, Outgoing, Presence, PresenceType, ProtocolClient,
};
use crate::validation::{split_room_id, DEFAULT_COMMAND_PREFIX};

/// Messages posted to the bot's own event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalMessage {
    IdleTick,
    Shutdown,
}

/// Lifecycle callbacks. Every method has a no-op default.
pub trait BotHooks: Send {
    /// Session is up, before rooms are joined.
    fn on_connect(&mut self, _identity: &BotIdentity) {}

    /// Session is about to close.
    fn on_disconnect(&mut self) {}

    /// A master user completed the subscription handshake. A returned text is
    /// sent to them as a chat message.
    fn on_register_user(&mut self, _who: &Jid) -> Option<String> {
        None
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default)]
pub struct NoHooks;

impl BotHooks for NoHooks {}

/// Construction-time settings that are not part of the identity.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Rooms (`room@server`) joined right after connecting.
    pub rooms: Vec<String>,
    /// Master users expected to complete a subscription handshake.
    pub users: Vec<Jid>,
    pub command_prefix: char,
    pub idle_interval: Option<Duration>,
    pub join_timeout: Option<Duration>,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            rooms: Vec::new(),
            users: Vec::new(),
            command_prefix: DEFAULT_COMMAND_PREFIX,
            idle_interval: Some(Duration::from_secs(60)),
            join_timeout: None,
        }
    }
}

/// Cloneable handle that asks a running [`Bot`] event loop to exit.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<InternalMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(InternalMessage::Shutdown);
    }
}

/// # Chat Bot - Core Application Controller
///
/// `Bot` owns one bot identity and drives everything that happens on its
/// session: joining rooms, classifying inbound events, running commands and
/// sending replies through the [`ProtocolClient`].
///
/// ## Architecture
///
/// ```text
/// ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
/// │  Protocol       │───→│   Bot           │───→│  Command        │
/// │  Client         │    │   (router)      │    │  Registry       │
/// └─────────────────┘    └─────────────────┘    └─────────────────┘
///                               │
/// ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
/// │  Room Join      │←───│                 │───→│  Subscription   │
/// │  Coordinator    │    │                 │    │  Handshake      │
/// └─────────────────┘    └─────────────────┘    └─────────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,no_run
/// use mucbot::bot::Bot;
/// use mucbot::config::Config;
/// use mucbot::protocol::ChannelClient;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config.toml").await?;
///     let (client, _outgoing) = ChannelClient::channel();
///     let (_events_tx, events) = tokio::sync::mpsc::unbounded_channel();
///     let mut bot = Bot::from_config(&config, client)?;
///     bot.register_fn("ping", |_, _| Ok(Some("pong".into())))?;
///     bot.start(events).await?;
///     Ok(())
/// }
/// ```
///
/// ## Thread Safety
///
/// All state is owned by the bot and touched only from the task running
/// [`Bot::run`]; inbound events are handled one at a time.
pub struct Bot<C: ProtocolClient> {
    identity: BotIdentity,
    server: ServerAddress,
    client: C,
    registry: CommandRegistry,
    router: MessageRouter,
    joins: RoomJoinCoordinator,
    subscriptions: PendingSubscriptions,
    hooks: Box<dyn BotHooks>,
    initial_rooms: Vec<String>,
    initial_users: Vec<Jid>,
    idle_interval: Option<Duration>,
    join_timeout: Option<Duration>,
    idle: Option<IdleHandle>,
    internal_tx: mpsc::UnboundedSender<InternalMessage>,
    internal_rx: Option<mpsc::UnboundedReceiver<InternalMessage>>,
}

impl<C: ProtocolClient> Bot<C> {
    pub fn new(identity: BotIdentity, server: ServerAddress, client: C, options: BotOptions) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        Self {
            joins: RoomJoinCoordinator::new(identity.resource()),
            subscriptions: PendingSubscriptions::new(options.users.iter().cloned()),
            identity,
            server,
            client,
            registry: CommandRegistry::with_builtins(),
            router: MessageRouter::new(options.command_prefix),
            hooks: Box::new(NoHooks),
            initial_rooms: options.rooms,
            initial_users: options.users,
            idle_interval: options.idle_interval,
            join_timeout: options.join_timeout,
            idle: None,
            internal_tx,
            internal_rx: Some(internal_rx),
        }
    }

    /// Build a bot from configuration. A missing resource label is generated here.
    pub fn from_config(config: &Config, client: C) -> anyhow::Result<Self> {
        config.validate()?;
        let jid = config.bot_jid()?;
        let identity = BotIdentity::new(
            jid,
            &config.bot.password,
            config.bot.resource.as_deref(),
            &config.bot.resource_prefix,
            &mut rand::thread_rng(),
        );
        let options = BotOptions {
            rooms: config.bot.rooms.clone(),
            users: config.master_users()?,
            command_prefix: config.bot.effective_command_prefix(),
            idle_interval: config.bot.idle_interval(),
            join_timeout: config.bot.join_timeout(),
        };
        Ok(Self::new(identity, config.server_address()?, client, options))
    }

    pub fn with_hooks<H: BotHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Current room → nickname mapping.
    pub fn rooms(&self) -> &RoomMembership {
        self.joins.membership()
    }

    pub fn join_state(&self, room_id: &str) -> JoinState {
        self.joins.state(room_id)
    }

    pub fn pending_subscriptions(&self) -> &PendingSubscriptions {
        &self.subscriptions
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.internal_tx.clone(),
        }
    }

    // ---- commands -------------------------------------------------------

    /// Install or replace a command handler.
    pub fn register_command<H: CommandHandler + 'static>(&mut self, name: &str, handler: H) -> BotResult<()> {
        self.registry.register(name, handler)
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F) -> BotResult<()>
    where
        F: Fn(&CommandContext<'_>, &[String]) -> CommandResult + Send + Sync + 'static,
    {
        self.registry.register_fn(name, f)
    }

    pub fn register_privileged_fn<F>(&mut self, name: &str, f: F) -> BotResult<()>
    where
        F: Fn(&CommandContext<'_>, &[String]) -> CommandResult + Send + Sync + 'static,
    {
        self.registry.register_privileged_fn(name, f)
    }

    // ---- lifecycle ------------------------------------------------------

    /// Open the session, then join the configured rooms and greet master users.
    pub fn connect(&mut self) -> BotResult<()> {
        if self.client.is_connected() {
            return Ok(());
        }
        self.client.connect(&self.server, &self.identity)?;
        info!(
            "session open for {} as {}",
            self.identity.jid(),
            self.identity.resource()
        );
        self.hooks.on_connect(&self.identity);

        let rooms = self.initial_rooms.clone();
        self.join(&rooms);

        for user in self.initial_users.clone() {
            if let Err(e) = self.register_user(&user) {
                warn!("failed to register user {}: {}", user, e);
            }
        }
        Ok(())
    }

    /// Connect and serve until shutdown. Connection failures abort startup.
    pub async fn start(&mut self, events: mpsc::UnboundedReceiver<Event>) -> BotResult<()> {
        self.connect()?;
        self.run(events).await
    }

    /// Event loop. Handles one inbound event at a time until the event stream
    /// closes, the client disconnects, a shutdown is requested or ctrl-c.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<Event>) -> BotResult<()> {
        let Some(mut internal_rx) = self.internal_rx.take() else {
            warn!("bot event loop already running");
            return Ok(());
        };
        if let Some(period) = self.idle_interval {
            self.idle = Some(start_idle_job(period, self.internal_tx.clone()));
        }

        // Periodic tick to drive join expiry even without incoming events
        let mut housekeeping = tokio::time::interval(Duration::from_secs(1));
        housekeeping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = housekeeping.tick() => {
                    self.expire_joins(Instant::now().into_std());
                }

                event = events.recv() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(event) {
                                warn!("event handling error: {}", e);
                            }
                        }
                        None => {
                            info!("event stream closed");
                            break;
                        }
                    }
                }

                msg = internal_rx.recv() => {
                    match msg {
                        Some(InternalMessage::IdleTick) => {
                            if let Err(e) = self.client.send(Outgoing::KeepAlive) {
                                debug!("keep-alive not sent: {}", e);
                            }
                        }
                        Some(InternalMessage::Shutdown) | None => {
                            info!("shutdown requested");
                            break;
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }

            if !self.client.is_connected() {
                warn!("protocol client disconnected");
                break;
            }
        }

        self.internal_rx = Some(internal_rx);
        self.stop().await;
        Ok(())
    }

    /// Stop serving: halt the idle job, abandon outstanding joins and close the session.
    pub async fn stop(&mut self) {
        if let Some(idle) = self.idle.take() {
            idle.stop().await;
        }
        for room_id in self.joins.abandon_all() {
            warn!("abandoning join attempt for {}", room_id);
        }
        if self.client.is_connected() {
            info!("Shutting down the bot...");
            self.hooks.on_disconnect();
            self.client.disconnect();
        }
    }

    fn expire_joins(&mut self, now: std::time::Instant) {
        let Some(timeout) = self.join_timeout else {
            return;
        };
        for room_id in self.joins.expire(now, timeout) {
            warn!("no answer from room {} after {:?}; join abandoned", room_id, timeout);
        }
    }

    // ---- event routing --------------------------------------------------

    /// Handle one inbound protocol event.
    pub fn handle_event(&mut self, event: Event) -> BotResult<()> {
        match event {
            Event::Message(msg) => self.handle_message(&msg),
            Event::Presence(presence) => self.handle_presence(&presence),
        }
    }

    pub fn handle_message(&mut self, msg: &Message) -> BotResult<()> {
        if let Some(body) = msg.body.as_deref() {
            debug!("{} message from {}: {}", msg.kind.as_str(), msg.from, escape_log(body));
        }
        let route = self
            .router
            .classify(msg, self.joins.membership(), self.identity.resource());
        match route {
            Route::JoinTrigger { room, server } => {
                info!("invited to {}@{} by {}", room, server, msg.from);
                self.join_room(&room, &server, None)
            }
            Route::SelfEcho | Route::Ignore => Ok(()),
            Route::Command(cmd) => {
                let reply = {
                    let ctx = CommandContext {
                        message: msg,
                        identity: &self.identity,
                        rooms: self.joins.membership(),
                        roster: self.client.roster(),
                        registry: &self.registry,
                    };
                    self.router.dispatch(&cmd, &self.registry, &ctx)
                };
                match reply {
                    Some(out) => self.client.send(out),
                    None => Ok(()),
                }
            }
        }
    }

    /// Presences from a room with an outstanding join go to the coordinator;
    /// everything else is a subscription matter.
    pub fn handle_presence(&mut self, presence: &Presence) -> BotResult<()> {
        if self.joins.is_pending(&presence.from.bare_str()) {
            return match self.joins.handle_presence(presence)? {
                JoinProgress::Retry(out) => self.client.send(out),
                JoinProgress::Joined { .. }
                | JoinProgress::Failed { .. }
                | JoinProgress::Stale
                | JoinProgress::NotPending => Ok(()),
            };
        }

        match self.subscriptions.handle(presence) {
            SubscriptionAction::Ignore => Ok(()),
            SubscriptionAction::Approve { to } => {
                info!("approving subscription from {}", to);
                self.client
                    .send(Outgoing::presence(to.clone(), PresenceType::Subscribed))?;
                self.client
                    .send(Outgoing::presence(to, PresenceType::Subscribe))
            }
            SubscriptionAction::Registered { who } => {
                if !self.client.roster_mut().subscription_approved(&who) {
                    debug!("subscription confirmed by {} who is no longer on the roster", who);
                    return Ok(());
                }
                info!("registered user {}", who);
                match self.hooks.on_register_user(&who) {
                    Some(text) => self.send_to(&who, &text),
                    None => Ok(()),
                }
            }
        }
    }

    // ---- rooms ----------------------------------------------------------

    /// Join each `room@server`. Malformed ids are logged and skipped.
    pub fn join<S: AsRef<str>>(&mut self, rooms: &[S]) {
        for room_id in rooms {
            let room_id = room_id.as_ref();
            let (room, server) = match split_room_id(room_id) {
                Ok(parts) => parts,
                Err(_) => {
                    warn!("invalid room to join: {}", escape_log(room_id));
                    continue;
                }
            };
            if let Err(e) = self.join_room(&room, &server, None) {
                warn!("unable to join {}: {}", room_id, e);
            }
        }
    }

    /// Request membership in `room@server`, optionally under a specific nickname.
    pub fn join_room(&mut self, room: &str, server: &str, resource: Option<&str>) -> BotResult<()> {
        let request = self.joins.start(room, server, resource)?;
        info!("joining {}@{}", room, server);
        self.client.send(request)
    }

    /// Leave each `room@server`. Malformed or unknown rooms are logged and skipped.
    pub fn leave<S: AsRef<str>>(&mut self, rooms: &[S]) {
        for room_id in rooms {
            let room_id = room_id.as_ref();
            match self.leave_room(room_id) {
                Ok(()) => {}
                Err(BotError::MalformedRoomIdentifier(_)) => {
                    warn!("invalid room to leave: {}", escape_log(room_id));
                }
                Err(e) => warn!("unable to leave {}: {}", room_id, e),
            }
        }
    }

    pub fn leave_room(&mut self, room_id: &str) -> BotResult<()> {
        let presence = self.joins.leave(room_id)?;
        info!("leaving room: {}", room_id);
        self.client.send(presence)
    }

    /// Change a joined room's subject.
    pub fn set_subject(&mut self, room_id: &str, subject: &str) -> BotResult<()> {
        let (room, server) = split_room_id(room_id)?;
        let room_id = format!("{}@{}", room, server);
        if !self.joins.membership().contains(&room_id) {
            return Err(BotError::NotJoined(room_id));
        }
        let to = Jid::new(Some(&room), &server, None)?;
        self.client.send(Outgoing::Message {
            to,
            body: format!("subject set to: {}", subject),
            kind: MessageType::GroupChat,
            subject: Some(subject.to_string()),
        })
    }

    // ---- users ----------------------------------------------------------

    /// Send a chat message to any address.
    pub fn send_to(&mut self, who: &Jid, body: &str) -> BotResult<()> {
        self.client.send(Outgoing::chat(who.clone(), body))
    }

    /// Add `jid` to the roster, allow it to see the bot, and ask to see it.
    pub fn register_user(&mut self, jid: &Jid) -> BotResult<()> {
        let bare = jid.bare();
        let roster = self.client.roster_mut();
        roster.subscribe(&bare);
        roster.authorize(&bare);
        self.subscriptions.insert(&bare);
        self.client
            .send(Outgoing::presence(bare, PresenceType::Subscribe))
    }

    /// Drop `jid` from the roster. Rooms and the bot itself are left alone.
    pub fn unregister_user(&mut self, jid: &Jid) -> bool {
        let bare = jid.bare();
        if self.joins.membership().is_room(&bare) || bare == *self.identity.jid() {
            return false;
        }
        self.subscriptions.remove(&bare);
        let roster = self.client.roster_mut();
        roster.unsubscribe(&bare);
        roster.unauthorize(&bare);
        roster.remove(&bare)
    }

    /// Privileged users: roster entries that are neither rooms nor the bot.
    pub fn users(&self) -> Vec<Jid> {
        super::auth::AuthorizationGate::new(self.joins.membership(), self.client.roster())
            .privileged_users(self.identity.jid())
    }
}
