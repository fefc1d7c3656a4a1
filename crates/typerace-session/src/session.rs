//! The record of one connected participant.

use std::time::{Duration, Instant};

use typerace_protocol::ParticipantId;
use typerace_transport::ConnectionId;

/// A live connection and the participant id it was given.
#[derive(Debug, Clone)]
pub struct Session {
    /// The id the lobby coordinator attributes this connection's requests to.
    pub participant_id: ParticipantId,

    /// The transport connection this session is bound to.
    pub connection_id: ConnectionId,

    /// When the connection was accepted.
    pub connected_at: Instant,
}

impl Session {
    /// How long this connection has been open.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
