//! The `proces=` status field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness state a participant records in its own record file.
///
/// The canvas draws this as a coloured outline; it is the only channel
/// through which a running agent is visualised. Unknown values are kept
/// verbatim (lowercased) so they round-trip through the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessStatus {
    /// No `proces=` field, or an empty one.
    #[default]
    Unset,
    /// Idle.
    Off,
    /// Request in flight.
    On,
    /// Last run failed.
    Error,
    /// Waiting on a peer (readiness, output, or retry backoff).
    Lag,
    /// Stale result.
    Old,
    /// Anything else, lowercased.
    Other(String),
}

impl ProcessStatus {
    /// Parses a raw field value. Case and surrounding whitespace are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "" => Self::Unset,
            "off" => Self::Off,
            "on" => Self::On,
            "error" => Self::Error,
            "lag" => Self::Lag,
            "old" => Self::Old,
            _ => Self::Other(value),
        }
    }

    /// The lowercase field value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::Off => "off",
            Self::On => "on",
            Self::Error => "error",
            Self::Lag => "lag",
            Self::Old => "old",
            Self::Other(value) => value,
        }
    }

    /// Whether the value is one of the recognised states.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Whether a participant in this state is busy with a request.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::On | Self::Lag)
    }

    /// Whether the handshake state machine allows moving from `self` to `next`.
    ///
    /// `OFF → ON → {OFF | ERROR | LAG}`, `LAG → {LAG | ON | OFF | ERROR}`.
    /// A fresh run may start from any settled state. Re-asserting the
    /// current state is always allowed.
    #[must_use]
    pub fn can_transition_to(&self, next: &ProcessStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (Self::On, Self::Off | Self::Error | Self::Lag) => true,
            (Self::Lag, Self::On | Self::Off | Self::Error) => true,
            (Self::Unset | Self::Off | Self::Error | Self::Old | Self::Other(_), Self::On) => true,
            (_, Self::Off) => !self.is_busy(),
            _ => false,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProcessStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ProcessStatus {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ProcessStatus> for String {
    fn from(value: ProcessStatus) -> Self {
        value.as_str().to_string()
    }
}
