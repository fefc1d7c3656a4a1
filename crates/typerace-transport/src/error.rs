/// Failures on a WebSocket connection or listener.
///
/// Tungstenite's own errors are folded into `std::io::Error` so callers
/// only see one source type.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away, with the close reason if it gave one.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a text frame, or the close frame, to the socket failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading the next frame failed: a protocol violation or a reset
    /// socket. A clean close is not an error.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener, accepting a TCP stream, or the WebSocket
    /// upgrade failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_io_failures_keep_their_source() {
        let err = TransportError::ReceiveFailed(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset without closing handshake",
        ));
        assert_eq!(
            err.to_string(),
            "receive failed: reset without closing handshake"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_closed_has_no_source() {
        let err = TransportError::ConnectionClosed("going away".into());
        assert_eq!(err.to_string(), "connection closed: going away");
        assert!(err.source().is_none());
    }
}
