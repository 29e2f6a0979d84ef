//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::{Deserialize, Serialize};

use crate::application::services::{
    ConversationHistory, ConversationOverview, DirectoryEntry, UserDirectory,
};
use crate::domain::DirectMessage;

/// Delivery flags of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub delivered: bool,
    pub read: bool,
}

/// Message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message_id: String,
    pub sender_id: String,
    pub content: String,
    pub timestamp: String,
    pub delivery_status: DeliveryStatus,
}

impl From<DirectMessage> for MessageResponse {
    fn from(message: DirectMessage) -> Self {
        Self {
            message_id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            content: message.content,
            timestamp: message.created_at.to_rfc3339(),
            delivery_status: DeliveryStatus {
                delivered: message.delivered,
                read: message.read,
            },
        }
    }
}

/// One page of conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageResponse>,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<ConversationHistory> for MessageListResponse {
    fn from(history: ConversationHistory) -> Self {
        let page = history.page;
        Self {
            conversation_id: history.conversation_id.to_string(),
            messages: page.messages.into_iter().map(MessageResponse::from).collect(),
            has_more: page.has_more,
            next_cursor: page.next_cursor.map(|id| id.to_string()),
        }
    }
}

/// Counterpart of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherUserResponse {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub online: bool,
}

/// Conversation list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub other_user: OtherUserResponse,
    pub last_message: MessageResponse,
    pub unread_count: i64,
}

impl From<ConversationOverview> for ConversationResponse {
    fn from(overview: ConversationOverview) -> Self {
        let summary = overview.summary;
        Self {
            conversation_id: summary.conversation_id.to_string(),
            other_user: OtherUserResponse {
                user_id: summary.other_user_id.to_string(),
                username: summary.other_username,
                status: summary.other_status,
                online: overview.online,
            },
            last_message: MessageResponse {
                message_id: summary.last_message_id.to_string(),
                sender_id: summary.last_message_sender_id.to_string(),
                content: summary.last_message_content,
                timestamp: summary.last_message_at.to_rfc3339(),
                delivery_status: DeliveryStatus {
                    delivered: summary.delivered,
                    read: summary.read,
                },
            },
            unread_count: summary.unread_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationResponse>,
}

impl FromIterator<ConversationOverview> for ConversationListResponse {
    fn from_iter<I: IntoIterator<Item = ConversationOverview>>(iter: I) -> Self {
        Self {
            conversations: iter.into_iter().map(ConversationResponse::from).collect(),
        }
    }
}

/// User directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub status: String,
    pub last_seen: String,
    pub online: bool,
}

impl From<DirectoryEntry> for UserResponse {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            user_id: entry.user.id.to_string(),
            username: entry.user.username,
            status: entry.user.status,
            last_seen: entry.user.last_seen.to_rfc3339(),
            online: entry.online,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationResponse {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: PaginationResponse,
}

impl From<UserDirectory> for UserListResponse {
    fn from(directory: UserDirectory) -> Self {
        Self {
            users: directory.entries.into_iter().map(UserResponse::from).collect(),
            pagination: PaginationResponse {
                total: directory.total,
                page: directory.page,
                limit: directory.limit,
                next_page: directory.next_page,
            },
        }
    }
}
