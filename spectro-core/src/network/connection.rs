//! Managed TCP connection to the instrument server.
//!
//! [`ConnectionManager`] is the single owner of the socket: nothing else
//! reads or writes it, which is what keeps two callers from interleaving
//! traffic on the wire. Lifecycle is construct → `connect` → `request`*
//! → `close`; a faulted connection requires an explicit reconnect.
//!
//! The protocol is strictly request/response with at most one command in
//! flight, enforced fail-fast: a `request` while another is outstanding
//! returns [`ClientError::Busy`] instead of queueing.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::SpectroCodec;
use crate::command::Command;
use crate::error::{ClientError, ConnectionError};
use crate::measurement::{Measurement, Reply};
use crate::state::ConnectionState;

// ── Endpoint ─────────────────────────────────────────────────────

/// Host/port pair identifying the instrument server.
///
/// Fixed at connect time; the only way to change it is an explicit
/// reconnect with a new endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The string was not of the form `host:port`.
#[derive(Debug, Error)]
#[error("invalid endpoint (expected host:port): {0}")]
pub struct ParseEndpointError(pub String);

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseEndpointError(s.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ParseEndpointError(s.to_string()))?;
        if host.is_empty() {
            return Err(ParseEndpointError(s.to_string()));
        }
        Ok(Endpoint::new(host, port))
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// Socket state guarded by the I/O lock.
struct Io {
    framed: Option<Framed<TcpStream, SpectroCodec>>,
    /// Set while an exchange is in progress and cleared on clean
    /// completion. If a request future is dropped mid-exchange the flag
    /// stays set, and the next use faults the connection: the socket
    /// contents are unknowable after an abandoned partial read.
    dirty: bool,
}

/// Owns the socket and drives the request/response exchange.
pub struct ConnectionManager {
    io: tokio::sync::Mutex<Io>,
    state: Mutex<ConnectionState>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            io: tokio::sync::Mutex::new(Io {
                framed: None,
                dirty: false,
            }),
            state: Mutex::new(ConnectionState::default()),
        }
    }

    /// Snapshot of the current connection state.
    pub fn state(&self) -> ConnectionState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, apply: impl FnOnce(&mut ConnectionState)) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = *guard;
        apply(&mut guard);
        let after = *guard;
        if before != after {
            tracing::debug!(from = %before, to = %after, "connection state changed");
        }
    }

    /// Open the stream socket, replacing any existing connection.
    ///
    /// Distinguishes a dead deadline ([`ConnectionError::Timeout`]) from
    /// an active rejection ([`ConnectionError::Refused`]) so the caller
    /// can report the right message.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<(), ConnectionError> {
        let mut io = self.io.lock().await;
        io.framed = None;
        io.dirty = false;
        self.set_state(|s| s.begin_connect());
        tracing::info!(%endpoint, "connecting");

        let attempt = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!("set_nodelay failed: {e}");
                }
                io.framed = Some(Framed::new(stream, SpectroCodec));
                self.set_state(|s| s.complete_connect());
                tracing::info!(%endpoint, "connected");
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_state(|s| s.fault());
                tracing::warn!(%endpoint, "connect failed: {e}");
                Err(ConnectionError::Refused(format!("{endpoint}: {e}")))
            }
            Err(_elapsed) => {
                self.set_state(|s| s.fault());
                tracing::warn!(%endpoint, ?timeout, "connect timed out");
                Err(ConnectionError::Timeout(timeout))
            }
        }
    }

    /// Send one command and block until its complete reply has been
    /// decoded, the deadline passes, or the connection fails.
    ///
    /// Network reads may return partial data at arbitrary boundaries, so
    /// the reply is accumulated and re-decoded until complete (the codec
    /// treats "no terminator yet" as keep-reading, never as an error).
    /// Every terminal failure moves the connection to `Faulted` and
    /// releases the socket; only a clean reply leaves it usable.
    pub async fn request(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<Measurement, ClientError> {
        // Fail fast instead of interleaving writes on the shared socket.
        let mut io = self.io.try_lock().map_err(|_| ClientError::Busy)?;

        if io.dirty {
            tracing::warn!("socket abandoned mid-exchange; faulting");
            self.fault_io(&mut io);
            return Err(ConnectionError::Closed.into());
        }
        if io.framed.is_none() {
            return Err(ConnectionError::Closed.into());
        }

        io.dirty = true;
        tracing::debug!(%command, "request");
        match tokio::time::timeout(timeout, exchange(&mut io, command)).await {
            Ok(Ok(reply)) => {
                io.dirty = false;
                tracing::debug!(%command, samples = reply.wavelength.len(), "reply decoded");
                Ok(Measurement::from_reply(command, reply))
            }
            Ok(Err(e)) => {
                tracing::warn!(%command, "request failed: {e}");
                self.fault_io(&mut io);
                Err(e)
            }
            Err(_elapsed) => {
                tracing::warn!(%command, ?timeout, "request timed out");
                self.fault_io(&mut io);
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    /// Release the socket and return to `Disconnected`.
    pub async fn close(&self) {
        let mut io = self.io.lock().await;
        io.framed = None;
        io.dirty = false;
        self.set_state(|s| s.reset());
    }

    /// Drop the socket and mark the connection `Faulted`.
    fn fault_io(&self, io: &mut Io) {
        io.framed = None;
        io.dirty = false;
        self.set_state(|s| s.fault());
    }
}

/// One full request/response exchange on the open socket.
async fn exchange(io: &mut Io, command: Command) -> Result<Reply, ClientError> {
    let framed = io.framed.as_mut().ok_or(ConnectionError::Closed)?;
    framed.send(command).await?;
    match framed.next().await {
        Some(Ok(reply)) => Ok(reply),
        Some(Err(e)) => Err(e),
        // Clean EOF before a complete record.
        None => Err(ConnectionError::Closed.into()),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display() {
        let ep = Endpoint::new("127.0.0.1", 12345);
        assert_eq!(ep.to_string(), "127.0.0.1:12345");
        assert_eq!(ep.host(), "127.0.0.1");
        assert_eq!(ep.port(), 12345);
    }

    #[test]
    fn endpoint_parse() {
        let ep: Endpoint = "spectro.lab:9000".parse().unwrap();
        assert_eq!(ep, Endpoint::new("spectro.lab", 9000));

        assert!("no-port".parse::<Endpoint>().is_err());
        assert!(":12345".parse::<Endpoint>().is_err());
        assert!("host:notaport".parse::<Endpoint>().is_err());
    }

    #[test]
    fn new_manager_is_disconnected() {
        let mgr = ConnectionManager::new();
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn request_without_connect_is_closed() {
        let mgr = ConnectionManager::new();
        let err = mgr
            .request(Command::DarkReference, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Connection(ConnectionError::Closed)
        ));
        // Never-connected is not a fault; it just needs a connect.
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
    }
}
