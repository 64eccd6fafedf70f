//! Inbound events and outbound stanzas exchanged with the protocol client.
//!
//! These are deliberately shallow: the bot only needs the message type, the
//! sender, an optional body and the namespace/attribute tags of child
//! elements. Full XML handling lives in whatever transport feeds the bot.
use super::jid::Jid;

/// Multi-user chat `<x/>` extension carried by room invitations and occupant presence.
pub const NS_MUC_USER: &str = "http://jabber.org/protocol/muc#user";
/// Legacy direct room invitation namespace.
pub const NS_CONFERENCE: &str = "jabber:x:conference";
/// Error code a room returns when the requested nickname is already in use.
pub const ERROR_CODE_CONFLICT: &str = "409";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Chat,
    GroupChat,
    Normal,
    Headline,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::GroupChat => "groupchat",
            MessageType::Normal => "normal",
            MessageType::Headline => "headline",
            MessageType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceType {
    /// Plain presence without a `type` attribute.
    Available,
    Unavailable,
    Subscribe,
    Subscribed,
    Unsubscribe,
    Unsubscribed,
    Probe,
    Error,
}

impl PresenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceType::Available => "available",
            PresenceType::Unavailable => "unavailable",
            PresenceType::Subscribe => "subscribe",
            PresenceType::Subscribed => "subscribed",
            PresenceType::Unsubscribe => "unsubscribe",
            PresenceType::Unsubscribed => "unsubscribed",
            PresenceType::Probe => "probe",
            PresenceType::Error => "error",
        }
    }
}

/// Child element tag: name, namespace and attributes only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: &str, namespace: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True when the element declares `ns` either as its namespace or via an `xmlns` attribute.
    pub fn has_namespace(&self, ns: &str) -> bool {
        self.namespace.as_deref() == Some(ns) || self.attr("xmlns") == Some(ns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub from: Jid,
    pub body: Option<String>,
    pub subject: Option<String>,
    pub children: Vec<Element>,
}

impl Message {
    pub fn new(kind: MessageType, from: Jid, body: Option<&str>) -> Self {
        Self {
            kind,
            from,
            body: body.map(str::to_string),
            subject: None,
            children: Vec::new(),
        }
    }

    pub fn chat(from: Jid, body: &str) -> Self {
        Self::new(MessageType::Chat, from, Some(body))
    }

    pub fn groupchat(from: Jid, body: &str) -> Self {
        Self::new(MessageType::GroupChat, from, Some(body))
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Room invitation or MUC user extension present.
    pub fn is_membership_control(&self) -> bool {
        self.children
            .iter()
            .any(|c| c.has_namespace(NS_MUC_USER) || c.has_namespace(NS_CONFERENCE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub kind: PresenceType,
    pub from: Jid,
    pub error_code: Option<String>,
    pub children: Vec<Element>,
}

impl Presence {
    pub fn new(kind: PresenceType, from: Jid) -> Self {
        Self {
            kind,
            from,
            error_code: None,
            children: Vec::new(),
        }
    }

    pub fn error(from: Jid, code: &str) -> Self {
        Self {
            kind: PresenceType::Error,
            from,
            error_code: Some(code.to_string()),
            children: Vec::new(),
        }
    }

    /// Nickname collision reported by a room.
    pub fn is_conflict(&self) -> bool {
        self.kind == PresenceType::Error && self.error_code.as_deref() == Some(ERROR_CODE_CONFLICT)
    }
}

/// One inbound protocol event, delivered to the bot one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(Message),
    Presence(Presence),
}

/// Stanzas the bot asks the protocol client to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Message {
        to: Jid,
        body: String,
        kind: MessageType,
        subject: Option<String>,
    },
    Presence {
        to: Jid,
        kind: PresenceType,
    },
    /// Membership request to `room@server/resource`.
    JoinRoom { to: Jid },
    /// Session-wide availability announced after authentication.
    InitialPresence,
    /// Whitespace ping emitted by the idle job.
    KeepAlive,
}

impl Outgoing {
    pub fn chat(to: Jid, body: &str) -> Self {
        Outgoing::Message {
            to,
            body: body.to_string(),
            kind: MessageType::Chat,
            subject: None,
        }
    }

    pub fn presence(to: Jid, kind: PresenceType) -> Self {
        Outgoing::Presence { to, kind }
    }

    /// Body of a chat or group chat message, if this is one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Outgoing::Message { body, .. } => Some(body.as_str()),
            _ => None,
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
    fn membership_control_detected_by_namespace_or_xmlns_attr() {
        let by_ns = Message::new(MessageType::Normal, jid("room@conf.example.com"), None)
            .with_child(Element::new("x", Some(NS_CONFERENCE)));
        assert!(by_ns.is_membership_control());

        let by_attr = Message::new(MessageType::Normal, jid("room@conf.example.com"), None)
            .with_child(Element::new("x", None).with_attr("xmlns", NS_MUC_USER));
        assert!(by_attr.is_membership_control());

        let other = Message::chat(jid("a@example.com/x"), "hi")
            .with_child(Element::new("active", Some("http://jabber.org/protocol/chatstates")));
        assert!(!other.is_membership_control());
    }

    #[test]
    fn conflict_requires_error_type_and_409() {
        let from = jid("room@conf.example.com/bot");
        assert!(Presence::error(from.clone(), "409").is_conflict());
        assert!(!Presence::error(from.clone(), "403").is_conflict());
        let mut odd = Presence::new(PresenceType::Available, from);
        odd.error_code = Some("409".into());
        assert!(!odd.is_conflict());
    }
}
