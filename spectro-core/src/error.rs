//! Domain-specific error types for the spectro protocol client.
//!
//! All fallible operations return `Result<T, ClientError>` (or a narrower
//! error where the layer permits). No panics on invalid input — every
//! error is typed and recoverable.

use std::time::Duration;

use thiserror::Error;

// ── ConnectionError ──────────────────────────────────────────────

/// Errors raised while establishing or using the stream socket.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection attempt did not complete within the deadline.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The remote end actively refused the connection (or the address
    /// could not be reached at all).
    #[error("connection refused by {0}")]
    Refused(String),

    /// The peer closed the socket, or the socket is not open.
    #[error("connection closed by peer")]
    Closed,
}

// ── ProtocolError ────────────────────────────────────────────────

/// Errors raised while decoding a server reply.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The record terminator has not arrived yet. Internal control flow
    /// for the read loop; never crosses the connection-manager boundary.
    #[error("reply frame incomplete")]
    Incomplete,

    /// The reply does not match the expected schema.
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// Build a `Malformed` error from any displayable cause.
    pub fn malformed(cause: impl std::fmt::Display) -> Self {
        ProtocolError::Malformed(cause.to_string())
    }
}

// ── ClientError ──────────────────────────────────────────────────

/// The canonical error type surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A request is already in flight on this connection. The protocol
    /// is strictly request/response, so a second request fails fast
    /// rather than interleaving writes on the shared socket.
    #[error("a request is already in flight")]
    Busy,

    /// The request did not complete within the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The underlying connection failed.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The server reply could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

// ── Convenient From implementations ──────────────────────────────

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::ConnectionRefused => {
                ClientError::Connection(ConnectionError::Refused(e.to_string()))
            }
            ErrorKind::TimedOut => ClientError::Timeout(Duration::ZERO),
            // Everything else means the socket is no longer trustworthy.
            _ => ClientError::Connection(ConnectionError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = ClientError::Busy;
        assert!(e.to_string().contains("in flight"));

        let e = ConnectionError::Refused("127.0.0.1:12345".into());
        assert!(e.to_string().contains("127.0.0.1:12345"));

        let e = ProtocolError::Malformed("expected an object".into());
        assert!(e.to_string().contains("expected an object"));
    }

    #[test]
    fn from_io_refused() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "nope");
        let e: ClientError = io_err.into();
        assert!(matches!(
            e,
            ClientError::Connection(ConnectionError::Refused(_))
        ));
    }

    #[test]
    fn from_io_other_is_closed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: ClientError = io_err.into();
        assert!(matches!(
            e,
            ClientError::Connection(ConnectionError::Closed)
        ));
    }

    #[test]
    fn protocol_error_wraps() {
        let e: ClientError = ProtocolError::malformed("bad json").into();
        assert!(matches!(e, ClientError::Protocol(ProtocolError::Malformed(_))));
    }
}
