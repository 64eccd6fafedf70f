//! Room membership and the join state machine.
//!
//! Joining a room is a multi-step exchange: the bot sends a membership
//! request presence to `room@server/nick`, and the room either accepts (any
//! presence back from the room), reports a nickname collision (error 409),
//! or refuses with some other error. On collision the nickname gets a `_`
//! appended and the request is re-sent, looping until the room stops
//! complaining.
//!
//! The exchange spans several inbound events, so each room's progress is an
//! explicit [`JoinState`] value advanced by [`RoomJoinCoordinator::handle_presence`]
//! instead of a suspended task:
//!
//! ```text
//! Idle ──start──▶ Requesting(nick) ──409──▶ Requesting(nick_) ──▶ ...
//!                      │                          │
//!                      ├── presence ──▶ Joined(nick)
//!                      ├── other error ──▶ JoinFailed
//!                      └── timeout / stop ──▶ Abandoned
//! ```
//!
//! Membership is recorded optimistically when a request goes out, so the
//! self-echo filter already knows the nickname while the room is answering.
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::error::{BotError, BotResult};
use crate::identity::DEFAULT_RESOURCE;
use crate::protocol::{Jid, Outgoing, Presence, PresenceType};
use crate::validation::split_room_id;

/// Suffix appended to a nickname after each collision.
pub const CONFLICT_SUFFIX: &str = "_";

/// Room id (`room@server`) to the resource label representing the bot in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomMembership {
    rooms: BTreeMap<String, String>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, room_id: &str, resource: &str) {
        self.rooms.insert(room_id.to_string(), resource.to_string());
    }

    pub fn remove(&mut self, room_id: &str) -> Option<String> {
        self.rooms.remove(room_id)
    }

    pub fn resource(&self, room_id: &str) -> Option<&str> {
        self.rooms.get(room_id).map(String::as_str)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// True when `jid`'s bare form is a room the bot is in.
    pub fn is_room(&self, jid: &Jid) -> bool {
        self.contains(&jid.bare_str())
    }

    /// Room ids in sorted order.
    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rooms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    Idle,
    Requesting { resource: String },
    Joined { resource: String },
    /// The room refused with an error other than a nickname collision.
    JoinFailed { resource: String, code: Option<String> },
    /// Torn down (timeout or shutdown) before the room answered.
    Abandoned { resource: String },
}

/// Transient state of one outstanding join attempt.
#[derive(Debug, Clone)]
pub struct PendingJoin {
    pub room: String,
    pub server: String,
    pub resource: String,
    pub conflicts: u32,
    pub started_at: Instant,
}

impl PendingJoin {
    pub fn room_id(&self) -> String {
        format!("{}@{}", self.room, self.server)
    }
}

/// What a presence did to an outstanding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinProgress {
    /// No attempt outstanding for the sender's room.
    NotPending,
    /// Collision reported for a nickname we are no longer trying.
    Stale,
    /// Collision; send this renewed request.
    Retry(Outgoing),
    Joined { room_id: String, resource: String },
    Failed { room_id: String, code: Option<String> },
}

#[derive(Debug)]
pub struct RoomJoinCoordinator {
    default_resource: String,
    membership: RoomMembership,
    pending: HashMap<String, PendingJoin>,
    states: HashMap<String, JoinState>,
}

impl RoomJoinCoordinator {
    /// `default_resource` is the nickname used when a join does not name one
    /// (normally the bot's session resource).
    pub fn new(default_resource: &str) -> Self {
        Self {
            default_resource: default_resource.to_string(),
            membership: RoomMembership::new(),
            pending: HashMap::new(),
            states: HashMap::new(),
        }
    }

    pub fn membership(&self) -> &RoomMembership {
        &self.membership
    }

    pub fn state(&self, room_id: &str) -> JoinState {
        self.states.get(room_id).cloned().unwrap_or(JoinState::Idle)
    }

    pub fn pending(&self, room_id: &str) -> Option<&PendingJoin> {
        self.pending.get(room_id)
    }

    pub fn is_pending(&self, room_id: &str) -> bool {
        self.pending.contains_key(room_id)
    }

    /// Error listening is active while any attempt is outstanding.
    pub fn is_listening(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Begin (or restart) a join. A new attempt for a room that already has
    /// one outstanding replaces it.
    pub fn start(&mut self, room: &str, server: &str, resource: Option<&str>) -> BotResult<Outgoing> {
        let resource = match resource.filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None if !self.default_resource.is_empty() => self.default_resource.clone(),
            None => DEFAULT_RESOURCE.to_string(),
        };
        let pending = PendingJoin {
            room: room.to_lowercase(),
            server: server.to_lowercase(),
            resource,
            conflicts: 0,
            started_at: Instant::now(),
        };
        self.request(pending)
    }

    fn request(&mut self, pending: PendingJoin) -> BotResult<Outgoing> {
        let to = Jid::new(Some(&pending.room), &pending.server, Some(&pending.resource))?;
        let room_id = pending.room_id();
        if self.pending.contains_key(&room_id) && pending.conflicts == 0 {
            debug!("replacing outstanding join attempt for {}", room_id);
        }
        self.membership.insert(&room_id, &pending.resource);
        self.states.insert(
            room_id.clone(),
            JoinState::Requesting {
                resource: pending.resource.clone(),
            },
        );
        self.pending.insert(room_id, pending);
        Ok(Outgoing::JoinRoom { to })
    }

    /// Advance the attempt for the presence sender's room, if there is one.
    pub fn handle_presence(&mut self, presence: &Presence) -> BotResult<JoinProgress> {
        let room_id = presence.from.bare_str();
        let Some(pending) = self.pending.get(&room_id) else {
            return Ok(JoinProgress::NotPending);
        };

        if presence.is_conflict() {
            if let Some(nick) = presence.from.resource() {
                if nick != pending.resource {
                    debug!(
                        "ignoring conflict for stale nickname {} in {} (now trying {})",
                        nick, room_id, pending.resource
                    );
                    return Ok(JoinProgress::Stale);
                }
            }
            let mut next = pending.clone();
            next.resource.push_str(CONFLICT_SUFFIX);
            next.conflicts += 1;
            warn!(
                "invalid resource name from room {}, trying new one ({})",
                room_id, next.resource
            );
            return self.request(next).map(JoinProgress::Retry);
        }

        // Anything else settles the attempt.
        let pending = match self.pending.remove(&room_id) {
            Some(p) => p,
            None => return Ok(JoinProgress::NotPending),
        };
        if presence.kind == PresenceType::Error {
            warn!(
                "room {} refused membership as {} (error {})",
                room_id,
                pending.resource,
                presence.error_code.as_deref().unwrap_or("unknown")
            );
            self.membership.remove(&room_id);
            self.states.insert(
                room_id.clone(),
                JoinState::JoinFailed {
                    resource: pending.resource,
                    code: presence.error_code.clone(),
                },
            );
            return Ok(JoinProgress::Failed {
                room_id,
                code: presence.error_code.clone(),
            });
        }

        info!("joined to {} as {}", room_id, pending.resource);
        self.membership.insert(&room_id, &pending.resource);
        self.states.insert(
            room_id.clone(),
            JoinState::Joined {
                resource: pending.resource.clone(),
            },
        );
        Ok(JoinProgress::Joined {
            room_id,
            resource: pending.resource,
        })
    }

    /// Abandon attempts that have been outstanding longer than `timeout`.
    /// Returns the abandoned room ids.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.started_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for room_id in &stale {
            self.abandon(room_id);
        }
        stale
    }

    /// Abandon every outstanding attempt (shutdown).
    pub fn abandon_all(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending.keys().cloned().collect();
        ids.sort();
        for room_id in &ids {
            self.abandon(room_id);
        }
        ids
    }

    fn abandon(&mut self, room_id: &str) {
        if let Some(pending) = self.pending.remove(room_id) {
            self.membership.remove(room_id);
            self.states.insert(
                room_id.to_string(),
                JoinState::Abandoned {
                    resource: pending.resource,
                },
            );
        }
    }

    /// Build the unavailable presence for a joined room and forget the room.
    pub fn leave(&mut self, room_id: &str) -> BotResult<Outgoing> {
        let (room, server) = split_room_id(room_id)?;
        let room_id = format!("{}@{}", room, server);
        let resource = self
            .membership
            .resource(&room_id)
            .map(str::to_string)
            .ok_or_else(|| BotError::NotJoined(room_id.clone()))?;
        let to = Jid::new(Some(&room), &server, Some(&resource))?;
        self.membership.remove(&room_id);
        self.pending.remove(&room_id);
        self.states.remove(&room_id);
        Ok(Outgoing::presence(to, PresenceType::Unavailable))
    }
}
