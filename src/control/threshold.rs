//! Threshold (bang-bang) relay decision.
//!
//! A heating element behind a relay has no intermediate state, so the
//! controller only ever answers "switch on", "switch off" or "leave it".
//! There is no deadband: `current == desired` is always a no-op, and a
//! reading that hovers around the setpoint can toggle the relay every tick.

use serde::{Deserialize, Serialize};

/// Logical level of a relay output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayLevel {
    Off,
    On,
}

impl RelayLevel {
    /// Telemetry encoding (`Off` = 0, `On` = 1).
    pub const fn as_state(self) -> i64 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for RelayLevel {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl core::fmt::Display for RelayLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Off => write!(f, "OFF"),
            Self::On => write!(f, "ON"),
        }
    }
}

/// Outcome of one decision for one bound relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    NoOp,
    TurnOn,
    TurnOff,
}

impl RelayCommand {
    /// The level a command drives the relay to, `None` for [`RelayCommand::NoOp`].
    pub const fn target_level(self) -> Option<RelayLevel> {
        match self {
            Self::NoOp => None,
            Self::TurnOn => Some(RelayLevel::On),
            Self::TurnOff => Some(RelayLevel::Off),
        }
    }
}

/// Decide what to do with a relay given the current reading, the setpoint
/// and the level the relay is physically at right now.
///
/// A command is only returned when it would change the physical level, so
/// calling this again after the command has been applied yields `NoOp`.
pub fn decide(current: f64, desired: f64, level: RelayLevel) -> RelayCommand {
    if current < desired && level == RelayLevel::Off {
        RelayCommand::TurnOn
    } else if current > desired && level == RelayLevel::On {
        RelayCommand::TurnOff
    } else {
        RelayCommand::NoOp
    }
}
