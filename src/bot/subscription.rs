//! Presence subscription handshake with master users.
//!
//! At startup the bot asks every configured master user for a subscription
//! and remembers them as pending. When one of them asks back, the bot
//! approves and requests the reciprocal subscription; when they confirm,
//! they leave the pending set and become registered. Requests from anyone
//! else are never approved.
use std::collections::BTreeSet;

use crate::protocol::{Jid, Presence, PresenceType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionAction {
    /// Nothing to do.
    Ignore,
    /// Send `subscribed` then `subscribe` to this address.
    Approve { to: Jid },
    /// Handshake complete; fire the registration hook.
    Registered { who: Jid },
}

#[derive(Debug, Clone, Default)]
pub struct PendingSubscriptions {
    pending: BTreeSet<Jid>,
}

impl PendingSubscriptions {
    pub fn new<I: IntoIterator<Item = Jid>>(users: I) -> Self {
        Self {
            pending: users.into_iter().map(|j| j.bare()).collect(),
        }
    }

    pub fn insert(&mut self, jid: &Jid) {
        self.pending.insert(jid.bare());
    }

    /// Forget `jid`; a later `subscribed` from it is ignored.
    pub fn remove(&mut self, jid: &Jid) -> bool {
        self.pending.remove(&jid.bare())
    }

    pub fn contains(&self, jid: &Jid) -> bool {
        self.pending.contains(&jid.bare())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn handle(&mut self, presence: &Presence) -> SubscriptionAction {
        let who = presence.from.bare();
        match presence.kind {
            PresenceType::Subscribe if self.pending.contains(&who) => {
                SubscriptionAction::Approve { to: who }
            }
            PresenceType::Subscribe => {
                sec_log!("ignoring subscription request from unexpected address {}", who);
                SubscriptionAction::Ignore
            }
            PresenceType::Subscribed if self.pending.remove(&who) => {
                SubscriptionAction::Registered { who }
            }
            _ => SubscriptionAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jid(s: &str) -> Jid {
        s.parse().unwrap()
    }

    #[test]
    fn pending_user_is_approved_then_registered() {
        let mut subs = PendingSubscriptions::new(vec![jid("owner@example.com")]);
        let ask = Presence::new(PresenceType::Subscribe, jid("owner@example.com/laptop"));
        assert_eq!(subs.handle(&ask), SubscriptionAction::Approve { to: jid("owner@example.com") });
        assert!(subs.contains(&jid("owner@example.com")));

        let done = Presence::new(PresenceType::Subscribed, jid("owner@example.com"));
        assert_eq!(subs.handle(&done), SubscriptionAction::Registered { who: jid("owner@example.com") });
        assert!(subs.is_empty());

        // A second confirmation is not a new registration
        assert_eq!(subs.handle(&done), SubscriptionAction::Ignore);
    }

    #[test]
    fn strangers_are_ignored() {
        let mut subs = PendingSubscriptions::new(vec![jid("owner@example.com")]);
        for kind in [PresenceType::Subscribe, PresenceType::Subscribed, PresenceType::Available] {
            let p = Presence::new(kind, jid("stranger@example.com"));
            assert_eq!(subs.handle(&p), SubscriptionAction::Ignore);
        }
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn removed_user_is_not_registered() {
        let mut subs = PendingSubscriptions::new(vec![jid("owner@example.com")]);
        assert!(subs.remove(&jid("owner@example.com/pc")));
        let done = Presence::new(PresenceType::Subscribed, jid("owner@example.com"));
        assert_eq!(subs.handle(&done), SubscriptionAction::Ignore);
        assert!(!subs.remove(&jid("owner@example.com")));
    }
}
