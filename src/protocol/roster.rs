//! In-memory roster kept by the protocol client.
//!
//! Entries are keyed by bare address. Any entry counts as "known"; the
//! subscription state is tracked so that `subscribe`/`authorize` and their
//! inverses behave like the server-side roster they mirror.
use std::collections::BTreeMap;

use super::jid::Jid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subscription {
    #[default]
    None,
    /// We receive their presence.
    To,
    /// They receive ours.
    From,
    Both,
}

impl Subscription {
    fn with_to(self, on: bool) -> Self {
        match (self, on) {
            (Subscription::None, true) | (Subscription::To, true) => Subscription::To,
            (Subscription::From, true) | (Subscription::Both, true) => Subscription::Both,
            (Subscription::Both, false) | (Subscription::From, false) => Subscription::From,
            (_, false) => Subscription::None,
        }
    }

    fn with_from(self, on: bool) -> Self {
        match (self, on) {
            (Subscription::None, true) | (Subscription::From, true) => Subscription::From,
            (Subscription::To, true) | (Subscription::Both, true) => Subscription::Both,
            (Subscription::Both, false) | (Subscription::To, false) => Subscription::To,
            (_, false) => Subscription::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterItem {
    pub subscription: Subscription,
    /// Outbound subscription request sent and not yet answered.
    pub ask: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    items: BTreeMap<Jid, RosterItem>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, jid: &Jid) -> bool {
        self.items.contains_key(&jid.bare())
    }

    pub fn get(&self, jid: &Jid) -> Option<&RosterItem> {
        self.items.get(&jid.bare())
    }

    /// Known contacts, sorted by address.
    pub fn items(&self) -> Vec<Jid> {
        self.items.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ask for their presence. Creates the entry when missing.
    pub fn subscribe(&mut self, jid: &Jid) {
        let item = self.items.entry(jid.bare()).or_default();
        if !matches!(item.subscription, Subscription::To | Subscription::Both) {
            item.ask = true;
        }
    }

    /// Record that they approved our subscription request. Unknown contacts
    /// are left out; returns whether an entry was updated.
    pub fn subscription_approved(&mut self, jid: &Jid) -> bool {
        match self.items.get_mut(&jid.bare()) {
            Some(item) => {
                item.subscription = item.subscription.with_to(true);
                item.ask = false;
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe(&mut self, jid: &Jid) {
        if let Some(item) = self.items.get_mut(&jid.bare()) {
            item.subscription = item.subscription.with_to(false);
            item.ask = false;
        }
    }

    /// Allow them to see our presence. Creates the entry when missing.
    pub fn authorize(&mut self, jid: &Jid) {
        let item = self.items.entry(jid.bare()).or_default();
        item.subscription = item.subscription.with_from(true);
    }

    pub fn unauthorize(&mut self, jid: &Jid) {
        if let Some(item) = self.items.get_mut(&jid.bare()) {
            item.subscription = item.subscription.with_from(false);
        }
    }

    /// Drop the entry entirely. Returns whether it existed.
    pub fn remove(&mut self, jid: &Jid) -> bool {
        self.items.remove(&jid.bare()).is_some()
    }
}
