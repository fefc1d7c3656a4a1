//! Error types for the session layer.

use typerace_protocol::ParticipantId;
use typerace_transport::ConnectionId;

/// Errors that can occur while binding connections to participant ids.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given participant. Usually means the
    /// connection was already torn down.
    #[error("session not found for participant {0}")]
    NotFound(ParticipantId),

    /// The connection already has a participant id. A connection gets
    /// exactly one for its whole lifetime.
    #[error("connection {0} already has a session")]
    AlreadyConnected(ConnectionId),
}
