//! WebSocket Message Types
//!
//! Every frame is a JSON object `{"type": ..., "data": {...}}`. Inbound
//! frames are decoded eagerly into [`InboundEnvelope`] by their type tag;
//! outbound frames are produced from [`OutboundEnvelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{ConversationId, PresenceStatus};

/// Maximum length of a direct message body, in characters
pub const MAX_CONTENT_LENGTH: u64 = 4000;

/// Error codes carried by `error` envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    /// Malformed frame, missing field or invalid value
    BadRequest = 1000,
    /// Unknown envelope type
    UnsupportedType = 1001,
    /// Recipient identity does not parse
    InvalidRecipient = 1002,
    /// Conversation identifier does not parse or excludes the caller
    InvalidConversation = 1003,
    /// Persistence failed
    ServerError = 1009,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Raw frame shape, used only to read the type tag before decoding `data`.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decoded inbound envelope
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEnvelope {
    DirectMessage(DirectMessagePayload),
    TypingIndicator(TypingIndicatorPayload),
    ReadReceipt(ReadReceiptPayload),
    Presence(PresencePayload),
}

/// Why an inbound frame could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not JSON, no type tag, or `data` does not fit the tagged payload.
    /// `kind` is the type tag when one could be read.
    Malformed { kind: String, reason: String },
    /// Well-formed frame with a type tag this server does not handle
    UnsupportedType(String),
}

impl DecodeError {
    /// Type tag of the rejected frame, for `original_message_type`
    pub fn kind(&self) -> &str {
        match self {
            DecodeError::Malformed { kind, .. } => kind,
            DecodeError::UnsupportedType(kind) => kind,
        }
    }
}

impl InboundEnvelope {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let RawEnvelope { kind, data } =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed {
                kind: "unknown".into(),
                reason: e.to_string(),
            })?;

        let decoded = match kind.as_str() {
            "direct_message" => serde_json::from_value(data).map(Self::DirectMessage),
            "typing_indicator" => serde_json::from_value(data).map(Self::TypingIndicator),
            "read_receipt" => serde_json::from_value(data).map(Self::ReadReceipt),
            "presence" => serde_json::from_value(data).map(Self::Presence),
            _ => return Err(DecodeError::UnsupportedType(kind.clone())),
        };

        decoded.map_err(|e| DecodeError::Malformed {
            kind,
            reason: e.to_string(),
        })
    }

    /// Wire type tag
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEnvelope::DirectMessage(_) => "direct_message",
            InboundEnvelope::TypingIndicator(_) => "typing_indicator",
            InboundEnvelope::ReadReceipt(_) => "read_receipt",
            InboundEnvelope::Presence(_) => "presence",
        }
    }
}

/// `direct_message` request from a sender
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct DirectMessagePayload {
    pub recipient_id: String,

    #[validate(length(min = 1, max = 4000, message = "must be 1-4000 characters"))]
    pub content: String,

    /// Client correlation id, echoed in acknowledgements only
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub message_id: String,
}

/// `typing_indicator` request. `status` is opaque and forwarded as sent.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct TypingIndicatorPayload {
    pub recipient_id: String,

    #[validate(length(min = 1, max = 32, message = "must be 1-32 characters"))]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadReceiptPayload {
    pub conversation_id: String,
    pub last_read_message_id: String,
}

/// Status is kept as text so an out-of-set value is reported as an invalid
/// status rather than a generic format error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresencePayload {
    pub status: String,
}

// ============================================================================
// Outbound
// ============================================================================

/// Envelope queued on a connection and written to its transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundEnvelope {
    MessageAck(MessageAck),
    DirectMessage(DirectMessagePush),
    TypingIndicator(TypingForward),
    ReadReceipt(ReadReceiptForward),
    PresenceUpdate(PresenceUpdate),
    Error(ErrorPayload),
}

impl OutboundEnvelope {
    pub fn error(code: ErrorCode, message: impl Into<String>, original_type: &str) -> Self {
        OutboundEnvelope::Error(ErrorPayload {
            code: code.as_u16(),
            message: message.into(),
            original_message_type: original_type.to_string(),
        })
    }

    pub fn presence(user_id: Uuid, username: &str, status: PresenceStatus) -> Self {
        OutboundEnvelope::PresenceUpdate(PresenceUpdate {
            user_id,
            username: username.to_string(),
            status,
        })
    }

    /// Wire type tag
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEnvelope::MessageAck(_) => "message_ack",
            OutboundEnvelope::DirectMessage(_) => "direct_message",
            OutboundEnvelope::TypingIndicator(_) => "typing_indicator",
            OutboundEnvelope::ReadReceipt(_) => "read_receipt",
            OutboundEnvelope::PresenceUpdate(_) => "presence_update",
            OutboundEnvelope::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    /// Accepted for processing, not yet durable
    Sent,
    /// Durably stored
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAck {
    pub client_message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_message_id: Option<Uuid>,
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Copy of a direct message pushed to a connected recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessagePush {
    pub message_id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingForward {
    pub user_id: Uuid,
    pub username: String,
    pub conversation_id: ConversationId,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceiptForward {
    pub user_id: Uuid,
    pub username: String,
    pub conversation_id: ConversationId,
    pub last_read_message_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user_id: Uuid,
    pub username: String,
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
    pub original_message_type: String,
}
