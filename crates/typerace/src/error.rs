//! Unified error type for the Typerace server.

use typerace_lobby::LobbyError;
use typerace_protocol::ProtocolError;
use typerace_session::SessionError;
use typerace_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TyperaceError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown participant, duplicate connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby-level error (not found, already started, coordinator gone).
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}
