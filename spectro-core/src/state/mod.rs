//! Connection lifecycle state.
//!
//! ```text
//!  Disconnected ──► Connecting ──► Connected
//!       ▲               │              │
//!       │               ▼              ▼
//!       └─────────── Faulted ◄─────────┘
//! ```
//!
//! `Disconnected` and `Faulted` both mean "not usable": an explicit
//! connect is required before further commands are accepted. Reconnect
//! is just another connect attempt; `Faulted` carries no special retry
//! machinery.
//!
//! The [`ConnectionManager`](crate::network::ConnectionManager) is the
//! sole mutator and always sequences transitions legally, so the
//! transition methods are infallible; an unexpected source state is
//! logged and treated as a reconnect rather than policed at runtime.

use std::fmt;
use std::time::Instant;

/// The current phase of the client's connection to the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ConnectionState {
    /// No active connection. Initial state.
    #[default]
    Disconnected,

    /// TCP connection initiated but not yet established.
    Connecting,

    /// Link is up; ready for a request.
    Connected {
        /// When the connection entered the `Connected` state.
        since: Instant,
    },

    /// The socket failed or is no longer trustworthy (abandoned partial
    /// read, peer close, timeout). Requires an explicit reconnect.
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Faulted => write!(f, "Faulted"),
        }
    }
}

impl ConnectionState {
    /// Returns `true` when the link is established and a request may be
    /// issued.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` for the states that require an explicit connect
    /// before use.
    pub fn needs_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Faulted)
    }

    /// How long the connection has been in the `Connected` state.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Enter `Connecting`. Expected from `Disconnected` or `Faulted`;
    /// anything else is logged as an implicit reconnect.
    pub fn begin_connect(&mut self) {
        if !self.needs_connect() {
            tracing::warn!(from = %self, "begin_connect on a live connection; reconnecting");
        }
        *self = Self::Connecting;
    }

    /// Enter `Connected`, stamping the current time.
    pub fn complete_connect(&mut self) {
        *self = Self::Connected {
            since: Instant::now(),
        };
    }

    /// Force-transition to `Faulted`, from any state.
    pub fn fault(&mut self) {
        *self = Self::Faulted;
    }

    /// Force-transition to `Disconnected`, from any state.
    pub fn reset(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut state = ConnectionState::default();
        assert!(state.needs_connect());

        state.begin_connect();
        assert_eq!(state, ConnectionState::Connecting);
        assert!(!state.is_usable());

        state.complete_connect();
        assert!(state.is_usable());
        assert!(state.connected_duration().is_some());

        state.reset();
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn fault_from_any_state() {
        for mut state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected {
                since: Instant::now(),
            },
            ConnectionState::Faulted,
        ] {
            state.fault();
            assert_eq!(state, ConnectionState::Faulted);
            assert!(state.needs_connect());
        }
    }

    #[test]
    fn reconnect_from_faulted() {
        let mut state = ConnectionState::Faulted;
        state.begin_connect();
        assert_eq!(state, ConnectionState::Connecting);
        state.complete_connect();
        assert!(state.is_usable());
    }

    #[test]
    fn connected_duration_only_when_connected() {
        assert_eq!(ConnectionState::Faulted.connected_duration(), None);
        assert_eq!(ConnectionState::Connecting.connected_duration(), None);
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(
            ConnectionState::Connected {
                since: Instant::now()
            }
            .to_string(),
            "Connected"
        );
        assert_eq!(ConnectionState::Faulted.to_string(), "Faulted");
    }
}
