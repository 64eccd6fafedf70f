//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)]

use mucbot::bot::{Bot, BotOptions};
use mucbot::identity::{BotIdentity, ServerAddress};
use mucbot::protocol::{ChannelClient, Event, Jid, Message, Outgoing, Presence, PresenceType};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

pub type TestBot = Bot<ChannelClient>;

pub fn jid(s: &str) -> Jid {
    s.parse().expect("valid jid")
}

pub fn identity(resource: &str) -> BotIdentity {
    BotIdentity::new(
        jid("bot@example.com"),
        "secret",
        Some(resource),
        "mucbot",
        &mut StdRng::seed_from_u64(7),
    )
}

/// A bot with nickname `bot` over a channel client, not yet connected.
pub fn new_bot(options: BotOptions) -> (TestBot, mpsc::UnboundedReceiver<Outgoing>) {
    let identity = identity("bot");
    let server = ServerAddress::for_jid(identity.jid());
    let (client, rx) = ChannelClient::channel();
    (Bot::new(identity, server, client, options), rx)
}

/// Connected bot with the connect-time stanzas already drained.
pub fn connected_bot(options: BotOptions) -> (TestBot, mpsc::UnboundedReceiver<Outgoing>) {
    let (mut bot, mut rx) = new_bot(options);
    bot.connect().expect("connect");
    drain(&mut rx);
    (bot, rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Outgoing>) -> Vec<Outgoing> {
    let mut out = Vec::new();
    while let Ok(stanza) = rx.try_recv() {
        out.push(stanza);
    }
    out
}

pub fn chat(bot: &mut TestBot, from: &str, body: &str) {
    bot.handle_event(Event::Message(Message::chat(jid(from), body)))
        .expect("handle chat");
}

pub fn groupchat(bot: &mut TestBot, from: &str, body: &str) {
    bot.handle_event(Event::Message(Message::groupchat(jid(from), body)))
        .expect("handle groupchat");
}

pub fn presence(bot: &mut TestBot, kind: PresenceType, from: &str) {
    bot.handle_event(Event::Presence(Presence::new(kind, jid(from))))
        .expect("handle presence");
}

pub fn presence_error(bot: &mut TestBot, from: &str, code: &str) {
    bot.handle_event(Event::Presence(Presence::error(jid(from), code)))
        .expect("handle presence error");
}

/// Bodies of every outbound chat/group chat message.
pub fn bodies(stanzas: &[Outgoing]) -> Vec<String> {
    stanzas
        .iter()
        .filter_map(|s| s.body().map(str::to_string))
        .collect()
}
