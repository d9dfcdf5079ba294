//! Protocol command definitions and the UI-action mapping.
//!
//! Both `Command` and `Action` are closed enums, so the action→command
//! lookup and the command→token mapping are total functions; an
//! "unknown command" can never reach the wire.

use std::fmt;

use crate::error::ProtocolError;

// ── Command ──────────────────────────────────────────────────────

/// All commands understood by the spectral-instrument protocol.
///
/// Five reference measurements plus the aiming beam, which is a
/// non-spectral alignment command but identical at the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Baseline scan with the shutter closed.
    DarkReference,
    /// Broadband calibration scan.
    WhiteReference,
    /// White reference through the attenuator.
    AttenuatedWhiteReference,
    /// Mercury emission-line scan.
    MercuryReference,
    /// Neon emission-line scan.
    NeonReference,
    /// Fire the alignment laser.
    AimingBeam,
}

/// Every command, in a fixed order. Handy for iteration in tests and
/// front-ends.
pub const ALL_COMMANDS: [Command; 6] = [
    Command::DarkReference,
    Command::WhiteReference,
    Command::AttenuatedWhiteReference,
    Command::MercuryReference,
    Command::NeonReference,
    Command::AimingBeam,
];

impl Command {
    /// The canonical wire token for this command.
    pub fn token(&self) -> &'static str {
        match self {
            Command::DarkReference => "DARK_REFERENCE",
            Command::WhiteReference => "WHITE_REFERENCE",
            Command::AttenuatedWhiteReference => "ATTENUATED_WHITE_REFERENCE",
            Command::MercuryReference => "MERCURY_REFERENCE",
            Command::NeonReference => "NEON_REFERENCE",
            Command::AimingBeam => "AIMING_BEAM",
        }
    }

    /// Parse a wire token back into a `Command`.
    ///
    /// Used by test fixtures that play the server side; an unknown token
    /// is a protocol-level error, not a panic.
    pub fn from_token(token: &str) -> Result<Self, ProtocolError> {
        ALL_COMMANDS
            .into_iter()
            .find(|c| c.token() == token)
            .ok_or_else(|| ProtocolError::Malformed(format!("unknown command token: {token}")))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ── Action ───────────────────────────────────────────────────────

/// The six fixed user-facing actions, one per front-panel button.
///
/// Distinct from [`Command`] so the presentation layer never deals in
/// wire tokens; the mapping between the two is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    DarkReference,
    WhiteReference,
    AttenuatedWhiteReference,
    MercuryReference,
    NeonReference,
    AimingBeam,
}

/// Every action, in the same fixed order as [`ALL_COMMANDS`].
pub const ALL_ACTIONS: [Action; 6] = [
    Action::DarkReference,
    Action::WhiteReference,
    Action::AttenuatedWhiteReference,
    Action::MercuryReference,
    Action::NeonReference,
    Action::AimingBeam,
];

impl Action {
    /// The protocol command this action drives.
    pub fn command(&self) -> Command {
        match self {
            Action::DarkReference => Command::DarkReference,
            Action::WhiteReference => Command::WhiteReference,
            Action::AttenuatedWhiteReference => Command::AttenuatedWhiteReference,
            Action::MercuryReference => Command::MercuryReference,
            Action::NeonReference => Command::NeonReference,
            Action::AimingBeam => Command::AimingBeam,
        }
    }

    /// The human-readable label, as shown on the instrument front panel.
    pub fn label(&self) -> &'static str {
        match self {
            Action::DarkReference => "Dark Reference",
            Action::WhiteReference => "White Reference",
            Action::AttenuatedWhiteReference => "Attenuated White Reference",
            Action::MercuryReference => "Mercury Reference",
            Action::NeonReference => "Neon Reference",
            Action::AimingBeam => "Aiming Beam",
        }
    }

    /// Look an action up by its label. `None` means the caller passed a
    /// label that no button produces, which is a front-end bug rather
    /// than a protocol condition.
    pub fn from_label(label: &str) -> Option<Self> {
        ALL_ACTIONS.into_iter().find(|a| a.label() == label)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip() {
        for cmd in ALL_COMMANDS {
            assert_eq!(Command::from_token(cmd.token()).unwrap(), cmd);
        }
    }

    #[test]
    fn unknown_token_is_malformed() {
        let err = Command::from_token("SELF_DESTRUCT").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn tokens_are_unique() {
        for a in ALL_COMMANDS {
            for b in ALL_COMMANDS {
                if a != b {
                    assert_ne!(a.token(), b.token());
                }
            }
        }
    }

    #[test]
    fn action_command_mapping_is_total() {
        let commands: Vec<Command> = ALL_ACTIONS.iter().map(|a| a.command()).collect();
        assert_eq!(commands, ALL_COMMANDS.to_vec());
    }

    #[test]
    fn label_roundtrip() {
        for action in ALL_ACTIONS {
            assert_eq!(Action::from_label(action.label()), Some(action));
        }
        assert_eq!(Action::from_label("Warp Drive"), None);
    }
}
