//! Idle keep-alive job.
//!
//! A small spawned task that wakes up every `period` and posts
//! [`InternalMessage::IdleTick`] to the bot's internal channel; the event
//! loop turns each tick into a whitespace ping so intermediaries do not
//! drop a quiet session. The task owns no bot state.
//!
//! Stopping is explicit via [`IdleHandle::stop`]; the task also exits on its
//! own once the bot side of the channel is gone.
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::server::InternalMessage;

enum IdleCommand {
    Stop(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
pub struct IdleHandle {
    tx: mpsc::UnboundedSender<IdleCommand>,
}

impl std::fmt::Debug for IdleCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Stop")
    }
}

impl IdleHandle {
    /// Stop the job and wait for it to acknowledge.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(IdleCommand::Stop(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Spawn the keep-alive task. Must be called inside a tokio runtime.
pub fn start_idle_job(period: Duration, sink: mpsc::UnboundedSender<InternalMessage>) -> IdleHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<IdleCommand>();
    let handle = IdleHandle { tx };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; the session was just opened.
        ticker.tick().await;
        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(IdleCommand::Stop(done)) => { let _ = done.send(()); break; }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if sink.send(InternalMessage::IdleTick).is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("idle job terminated");
    });

    handle
}
