//! Direct message entity and the conversation store contract.
//!
//! Maps to the `direct_messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::ConversationId;
use crate::shared::error::AppError;

/// Represents a direct message between two users.
///
/// Maps to the `direct_messages` table:
/// - id: UUID PRIMARY KEY (server-assigned at send time)
/// - sender_id: UUID NOT NULL
/// - recipient_id: UUID NOT NULL
/// - content: TEXT NOT NULL
/// - delivered: BOOLEAN NOT NULL DEFAULT FALSE
/// - delivered_at: TIMESTAMPTZ NULL
/// - read: BOOLEAN NOT NULL DEFAULT FALSE
/// - read_at: TIMESTAMPTZ NULL
/// - created_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Server-assigned message ID (never the client correlation id)
    pub id: Uuid,

    /// Author
    pub sender_id: Uuid,

    /// Addressee
    pub recipient_id: Uuid,

    /// Text content
    pub content: String,

    /// Set once the recipient's connection was handed the message
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,

    /// Set once the recipient fetched a history page containing the message
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl DirectMessage {
    /// Create a fresh, undelivered and unread message.
    pub fn new(
        id: Uuid,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender_id,
            recipient_id,
            content: content.into(),
            delivered: false,
            delivered_at: None,
            read: false,
            read_at: None,
            created_at,
        }
    }

    /// The conversation this message belongs to.
    pub fn conversation_id(&self) -> ConversationId {
        ConversationId::derive(self.sender_id, self.recipient_id)
    }

    /// Paging key: creation time, ties broken by id.
    ///
    /// History is ordered by this key descending.
    pub fn page_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

/// One page of conversation history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagePage {
    pub messages: Vec<DirectMessage>,
    pub has_more: bool,
    /// ID of the oldest returned message when `has_more`, otherwise `None`
    pub next_cursor: Option<Uuid>,
}

impl MessagePage {
    /// Build a page from a query that requested `limit + 1` rows.
    ///
    /// The extra row only signals that more history exists; it is dropped and
    /// the cursor points at the last message actually returned.
    pub fn from_overfetched(mut rows: Vec<DirectMessage>, limit: usize) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let next_cursor = if has_more {
            rows.last().map(|m| m.id)
        } else {
            None
        };

        Self {
            messages: rows,
            has_more,
            next_cursor,
        }
    }

    /// The newest message in this page, if any.
    pub fn newest(&self) -> Option<&DirectMessage> {
        self.messages.first()
    }
}

/// Summary row for one conversation, seen from a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub other_user_id: Uuid,
    /// Counterpart's username when the user directory knows it
    pub other_username: Option<String>,
    /// Counterpart's last persisted status
    pub other_status: Option<String>,
    pub last_message_id: Uuid,
    pub last_message_sender_id: Uuid,
    pub last_message_content: String,
    pub last_message_at: DateTime<Utc>,
    /// Collapsed delivery flags: always true for the viewer's own messages
    pub delivered: bool,
    pub read: bool,
    /// Unread messages addressed to the viewer
    pub unread_count: i64,
}

impl ConversationSummary {
    /// Summarize a conversation for `viewer_id` given its newest message.
    pub fn from_last_message(viewer_id: Uuid, last: &DirectMessage, unread_count: i64) -> Self {
        let sent_by_viewer = last.sender_id == viewer_id;
        let other_user_id = if sent_by_viewer {
            last.recipient_id
        } else {
            last.sender_id
        };

        Self {
            conversation_id: last.conversation_id(),
            other_user_id,
            other_username: None,
            other_status: None,
            last_message_id: last.id,
            last_message_sender_id: last.sender_id,
            last_message_content: last.content.clone(),
            last_message_at: last.created_at,
            delivered: sent_by_viewer || last.delivered,
            read: sent_by_viewer || last.read,
            unread_count,
        }
    }
}

/// Persistence contract shared by the message router and the history API.
///
/// Every call is independently atomic at the store level; no operation here
/// spans a multi-row transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a new message row. The message is stored with
    /// `delivered = false, read = false` regardless of its flags.
    async fn append(&self, message: &DirectMessage) -> Result<(), AppError>;

    /// Flip the delivered flag of a single message.
    ///
    /// Returns `false` when no undelivered message with that ID exists.
    async fn mark_delivered(&self, message_id: Uuid) -> Result<bool, AppError>;

    /// Fetch up to `limit` messages of a conversation, newest first.
    ///
    /// With `before`, only messages strictly older than the cursor message are
    /// eligible. An unknown cursor is a `BadRequest`.
    async fn fetch_page(
        &self,
        conversation_id: ConversationId,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<MessagePage, AppError>;

    /// Mark every message addressed to `reader_id` in the conversation, up to
    /// and including `through_message_id`, as read.
    ///
    /// Idempotent. Returns the number of rows that changed.
    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader_id: Uuid,
        through_message_id: Uuid,
    ) -> Result<u64, AppError>;

    /// One summary per counterpart `user_id` exchanged messages with,
    /// most recently active first.
    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}
