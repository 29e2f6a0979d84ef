//! Conversation identifier.
//!
//! A direct conversation is not stored anywhere; it is identified by the
//! ordered pair of its two participants. The wire form is the smaller UUID,
//! a literal hyphen, then the larger UUID:
//!
//! ```text
//! 0b5c7c8e-1d2a-4a51-9d3e-5f0c6a7b8c9d-7f1e2d3c-4b5a-4968-8776-655443322110
//! |<------------- 36 ---------------->|-|<-------------- 36 ------------->|
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Length of a hyphenated UUID string.
const UUID_LEN: usize = 36;

/// Total length of the wire form: two UUIDs and one separator.
pub const CONVERSATION_ID_LEN: usize = UUID_LEN * 2 + 1;

/// Errors produced when parsing a conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationIdError {
    #[error("conversation id must be {CONVERSATION_ID_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("conversation id must separate participants with '-'")]
    MissingSeparator,

    #[error("conversation id contains an invalid participant id")]
    InvalidParticipant,
}

/// Identifier of a two-party conversation.
///
/// Construction always orders the participants, so
/// `ConversationId::derive(a, b) == ConversationId::derive(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId {
    low: Uuid,
    high: Uuid,
}

impl ConversationId {
    /// Derive the identifier for the conversation between `a` and `b`.
    pub fn derive(a: Uuid, b: Uuid) -> Self {
        // Uuid orders by bytes, which matches the ordering of the lowercase
        // hyphenated strings.
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both participants, smaller first.
    pub fn participants(&self) -> (Uuid, Uuid) {
        (self.low, self.high)
    }

    /// Check whether `user_id` takes part in this conversation.
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The other participant, seen from `user_id`.
    ///
    /// Returns `None` when `user_id` is not a participant.
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if self.low == user_id {
            Some(self.high)
        } else if self.high == user_id {
            Some(self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low.hyphenated(), self.high.hyphenated())
    }
}

impl FromStr for ConversationId {
    type Err = ConversationIdError;

    /// Parse the wire form.
    ///
    /// Participants given in the wrong order are accepted and normalized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CONVERSATION_ID_LEN {
            return Err(ConversationIdError::InvalidLength(s.len()));
        }
        if s.as_bytes()[UUID_LEN] != b'-' {
            return Err(ConversationIdError::MissingSeparator);
        }

        // `get` rather than slicing: a multi-byte character could straddle the
        // boundary of an otherwise correctly sized string.
        let first = s
            .get(..UUID_LEN)
            .ok_or(ConversationIdError::InvalidParticipant)?;
        let second = s
            .get(UUID_LEN + 1..)
            .ok_or(ConversationIdError::InvalidParticipant)?;

        let a = Uuid::try_parse(first).map_err(|_| ConversationIdError::InvalidParticipant)?;
        let b = Uuid::try_parse(second).map_err(|_| ConversationIdError::InvalidParticipant)?;

        Ok(Self::derive(a, b))
    }
}

impl Serialize for ConversationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const A: &str = "0b5c7c8e-1d2a-4a51-9d3e-5f0c6a7b8c9d";
    const B: &str = "7f1e2d3c-4b5a-4968-8776-655443322110";

    fn ids() -> (Uuid, Uuid) {
        (Uuid::parse_str(A).unwrap(), Uuid::parse_str(B).unwrap())
    }

    #[test]
    fn test_derive_is_symmetric() {
        let (a, b) = ids();
        assert_eq!(ConversationId::derive(a, b), ConversationId::derive(b, a));

        for _ in 0..100 {
            let x = Uuid::new_v4();
            let y = Uuid::new_v4();
            assert_eq!(ConversationId::derive(x, y), ConversationId::derive(y, x));
            assert_eq!(
                ConversationId::derive(x, y).to_string(),
                ConversationId::derive(y, x).to_string()
            );
        }
    }

    #[test]
    fn test_smaller_identity_first() {
        let (a, b) = ids();
        let id = ConversationId::derive(b, a);
        assert_eq!(id.to_string(), format!("{}-{}", A, B));
        assert_eq!(id.participants(), (a, b));
    }

    #[test]
    fn test_string_order_matches_uuid_order() {
        for _ in 0..100 {
            let x = Uuid::new_v4();
            let y = Uuid::new_v4();
            assert_eq!(x < y, x.to_string() < y.to_string());
        }
    }

    #[test]
    fn test_parse_round_trip() {
        let (a, b) = ids();
        let id = ConversationId::derive(a, b);
        assert_eq!(id.to_string().parse::<ConversationId>(), Ok(id));
    }

    #[test]
    fn test_parse_normalizes_order() {
        let (a, b) = ids();
        let reversed = format!("{}-{}", B, A);
        assert_eq!(
            reversed.parse::<ConversationId>(),
            Ok(ConversationId::derive(a, b))
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("0b5c7c8e-1d2a-4a51-9d3e-5f0c6a7b8c9d" ; "single uuid")]
    #[test_case("0b5c7c8e-1d2a-4a51-9d3e-5f0c6a7b8c9d-7f1e2d3c-4b5a-4968-8776-6554433221100" ; "too long")]
    fn test_parse_rejects_length(input: &str) {
        assert_eq!(
            input.parse::<ConversationId>(),
            Err(ConversationIdError::InvalidLength(input.len()))
        );
    }

    #[test]
    fn test_parse_rejects_wrong_separator() {
        let input = format!("{}_{}", A, B);
        assert_eq!(
            input.parse::<ConversationId>(),
            Err(ConversationIdError::MissingSeparator)
        );
    }

    #[test_case("zb5c7c8e-1d2a-4a51-9d3e-5f0c6a7b8c9d-7f1e2d3c-4b5a-4968-8776-655443322110" ; "bad hex")]
    #[test_case("0b5c7c8e1d2a-4a51-9d3e-5f0c6a7b8c9d--7f1e2d3c-4b5a-4968-8776-655443322110" ; "shifted hyphens")]
    #[test_case("0b5c7c8e-1d2a-4a51-9d3e-5f0c6a7b8c9d-7f1e2d3c-4b5a-4968-8776-6554433221é" ; "multibyte tail")]
    fn test_parse_rejects_invalid_participant(input: &str) {
        assert_eq!(
            input.parse::<ConversationId>(),
            Err(ConversationIdError::InvalidParticipant)
        );
    }

    #[test]
    fn test_counterpart() {
        let (a, b) = ids();
        let id = ConversationId::derive(a, b);
        assert_eq!(id.counterpart(a), Some(b));
        assert_eq!(id.counterpart(b), Some(a));
        assert_eq!(id.counterpart(Uuid::new_v4()), None);
        assert!(id.includes(a));
        assert!(!id.includes(Uuid::nil()));
    }

    #[test]
    fn test_serde_as_string() {
        let (a, b) = ids();
        let id = ConversationId::derive(a, b);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}-{}\"", A, B));
        let back: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ConversationId>("\"nope\"").is_err());
    }
}
