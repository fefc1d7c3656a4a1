//! Fan-out of lobby events to the participants subscribed to a lobby.
//!
//! The coordinator only talks to the [`Broadcast`] trait. The server uses
//! [`ChannelGateway`], which delivers each event into an unbounded
//! per-participant channel drained by that participant's connection
//! handler.

use std::collections::HashMap;

use typerace_protocol::{LobbyCode, ParticipantId, ServerEvent};
use tokio::sync::mpsc;

/// Where a participant's connection handler receives lobby events.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// A publish/subscribe channel keyed by lobby code.
pub trait Broadcast: Send + 'static {
    /// Adds `id` to the lobby's channel.
    fn subscribe(&mut self, code: &LobbyCode, id: &ParticipantId);

    /// Removes `id` from the lobby's channel.
    fn unsubscribe(&mut self, code: &LobbyCode, id: &ParticipantId);

    /// Sends `event` to everyone subscribed to the lobby.
    fn publish(&mut self, code: &LobbyCode, event: ServerEvent);

    /// Drops the lobby's channel. Nothing published afterwards reaches
    /// its former subscribers.
    fn close(&mut self, code: &LobbyCode);
}

/// [`Broadcast`] over per-participant `mpsc` channels.
#[derive(Debug, Default)]
pub struct ChannelGateway {
    outboxes: HashMap<ParticipantId, Outbox>,
    channels: HashMap<LobbyCode, Vec<ParticipantId>>,
}

impl ChannelGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outbox for a connected participant. Replaces any
    /// previous one.
    pub fn attach(&mut self, id: ParticipantId, outbox: Outbox) {
        self.outboxes.insert(id, outbox);
    }

    /// Forgets a participant's outbox.
    pub fn detach(&mut self, id: &ParticipantId) {
        self.outboxes.remove(id);
    }

    pub fn subscriber_count(&self, code: &LobbyCode) -> usize {
        self.channels.get(code).map_or(0, Vec::len)
    }
}

impl Broadcast for ChannelGateway {
    fn subscribe(&mut self, code: &LobbyCode, id: &ParticipantId) {
        let subscribers = self.channels.entry(code.clone()).or_default();
        if !subscribers.contains(id) {
            subscribers.push(id.clone());
        }
    }

    fn unsubscribe(&mut self, code: &LobbyCode, id: &ParticipantId) {
        if let Some(subscribers) = self.channels.get_mut(code) {
            subscribers.retain(|s| s != id);
        }
    }

    fn publish(&mut self, code: &LobbyCode, event: ServerEvent) {
        let Some(subscribers) = self.channels.get(code) else {
            return;
        };
        for id in subscribers {
            let Some(outbox) = self.outboxes.get(id) else {
                continue;
            };
            // A closed receiver means the connection is going away; its
            // disconnect will clean up the subscription.
            if outbox.send(event.clone()).is_err() {
                tracing::warn!(%code, participant_id = %id, "outbox closed, event dropped");
            }
        }
    }

    fn close(&mut self, code: &LobbyCode) {
        self.channels.remove(code);
    }
}
