mod common;

use common::*;
use mucbot::bot::{BotHooks, BotOptions};
use mucbot::protocol::{Jid, Outgoing, PresenceType, ProtocolClient, Subscription};
use std::sync::{Arc, Mutex};

#[derive(Default, Clone)]
struct Recorder {
    connected: Arc<Mutex<u32>>,
    registered: Arc<Mutex<Vec<Jid>>>,
}

impl BotHooks for Recorder {
    fn on_connect(&mut self, _identity: &mucbot::identity::BotIdentity) {
        *self.connected.lock().unwrap() += 1;
    }

    fn on_register_user(&mut self, who: &Jid) -> Option<String> {
        self.registered.lock().unwrap().push(who.clone());
        Some("welcome aboard".into())
    }
}

fn owner_options() -> BotOptions {
    BotOptions {
        users: vec![jid("owner@example.com")],
        ..BotOptions::default()
    }
}

#[test]
fn connect_requests_subscription_from_master_users() {
    let (mut bot, mut rx) = new_bot(owner_options());
    bot.connect().unwrap();
    let sent = drain(&mut rx);
    assert!(sent.contains(&Outgoing::presence(jid("owner@example.com"), PresenceType::Subscribe)));
    assert!(bot.client().roster().contains(&jid("owner@example.com")));
    assert!(bot.pending_subscriptions().contains(&jid("owner@example.com")));
}

#[test]
fn full_handshake_registers_user_and_fires_hook() {
    let hooks = Recorder::default();
    let (bot, mut rx) = new_bot(owner_options());
    let mut bot = bot.with_hooks(hooks.clone());
    bot.connect().unwrap();
    drain(&mut rx);
    assert_eq!(*hooks.connected.lock().unwrap(), 1);

    presence(&mut bot, PresenceType::Subscribe, "owner@example.com/laptop");
    assert_eq!(
        drain(&mut rx),
        vec![
            Outgoing::presence(jid("owner@example.com"), PresenceType::Subscribed),
            Outgoing::presence(jid("owner@example.com"), PresenceType::Subscribe),
        ]
    );

    presence(&mut bot, PresenceType::Subscribed, "owner@example.com");
    assert_eq!(*hooks.registered.lock().unwrap(), vec![jid("owner@example.com")]);
    assert_eq!(bodies(&drain(&mut rx)), vec!["welcome aboard"]);
    assert!(bot.pending_subscriptions().is_empty());
    assert_eq!(
        bot.client().roster().get(&jid("owner@example.com")).unwrap().subscription,
        Subscription::Both
    );
}

#[test]
fn stranger_subscription_request_sends_nothing() {
    let (mut bot, mut rx) = connected_bot(owner_options());
    presence(&mut bot, PresenceType::Subscribe, "stranger@example.com/pc");
    presence(&mut bot, PresenceType::Subscribed, "stranger@example.com/pc");
    assert!(drain(&mut rx).is_empty());
    assert!(!bot.client().roster().contains(&jid("stranger@example.com")));
}

#[test]
fn send_to_and_users() {
    let (mut bot, mut rx) = connected_bot(owner_options());
    assert_eq!(bot.users(), vec![jid("owner@example.com")]);
    bot.send_to(&jid("owner@example.com/laptop"), "ping").unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![Outgoing::chat(jid("owner@example.com/laptop"), "ping")]
    );
}
