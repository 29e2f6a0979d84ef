//! Presence status value object.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User presence status.
///
/// Maps to the `users.status` column and to the `status` field of
/// `presence` / `presence_update` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
    #[default]
    Offline,
}

impl PresenceStatus {
    /// Convert to database / wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid presence status '{0}', expected online, away or offline")]
pub struct InvalidPresenceStatus(pub String);

impl FromStr for PresenceStatus {
    type Err = InvalidPresenceStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            other => Err(InvalidPresenceStatus(other.to_string())),
        }
    }
}
