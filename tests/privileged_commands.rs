mod common;

use common::*;
use mucbot::bot::BotOptions;
use mucbot::protocol::{PresenceType, ProtocolClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_bot() -> (TestBot, tokio::sync::mpsc::UnboundedReceiver<mucbot::protocol::Outgoing>, Arc<AtomicUsize>) {
    let (mut bot, rx) = connected_bot(BotOptions::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    bot.register_privileged_fn("shutdown", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some("bye".into()))
    })
    .unwrap();
    (bot, rx, calls)
}

#[test]
fn stranger_never_reaches_inner_handler() {
    let (mut bot, mut rx, calls) = counting_bot();
    chat(&mut bot, "stranger@example.com/pc", "!shutdown");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn roster_contact_is_allowed() {
    let (mut bot, mut rx, calls) = counting_bot();
    bot.register_user(&jid("owner@example.com")).unwrap();
    drain(&mut rx);
    chat(&mut bot, "owner@example.com/laptop", "!shutdown");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bodies(&drain(&mut rx)), vec!["bye"]);
}

#[test]
fn room_occupants_are_not_privileged_even_if_room_is_on_roster() {
    let (mut bot, mut rx, calls) = counting_bot();
    bot.join_room("abc", "conf.example.com", None).unwrap();
    presence(&mut bot, PresenceType::Available, "abc@conf.example.com/bot");
    bot.client_mut()
        .roster_mut()
        .authorize(&jid("abc@conf.example.com"));
    drain(&mut rx);

    groupchat(&mut bot, "abc@conf.example.com/owner", "!shutdown");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn unregistering_revokes_access() {
    let (mut bot, mut rx, calls) = counting_bot();
    bot.register_user(&jid("owner@example.com")).unwrap();
    assert!(bot.unregister_user(&jid("owner@example.com")));
    drain(&mut rx);
    chat(&mut bot, "owner@example.com/laptop", "!shutdown");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn late_confirmation_does_not_restore_revoked_user() {
    let (mut bot, mut rx) = connected_bot(BotOptions {
        users: vec![jid("owner@example.com")],
        ..BotOptions::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    bot.register_privileged_fn("secret", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some("classified".into()))
    })
    .unwrap();

    assert!(bot.unregister_user(&jid("owner@example.com")));
    assert!(!bot.pending_subscriptions().contains(&jid("owner@example.com")));

    presence(&mut bot, PresenceType::Subscribed, "owner@example.com");
    assert!(!bot.client().roster().contains(&jid("owner@example.com")));
    drain(&mut rx);

    chat(&mut bot, "owner@example.com/pc", "!secret");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn builtin_rooms_is_privileged() {
    let (mut bot, mut rx) = connected_bot(BotOptions::default());
    bot.join_room("abc", "conf.example.com", None).unwrap();
    drain(&mut rx);

    chat(&mut bot, "stranger@example.com/pc", "!rooms");
    assert!(drain(&mut rx).is_empty());

    bot.register_user(&jid("owner@example.com")).unwrap();
    drain(&mut rx);
    chat(&mut bot, "owner@example.com/pc", "!rooms");
    assert_eq!(bodies(&drain(&mut rx)), vec!["abc@conf.example.com"]);
}
