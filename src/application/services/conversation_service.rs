//! Conversation Service
//!
//! History paging with automatic read marking, and the conversation list
//! decorated with live presence.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::HistorySettings;
use crate::domain::{ConversationId, ConversationStore, ConversationSummary, MessagePage};
use crate::shared::error::AppError;

/// Live presence lookup, answered by the connection registry.
pub trait OnlineUsers: Send + Sync {
    fn is_online(&self, user_id: Uuid) -> bool;
}

/// Conversation service trait
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Fetch one page of a conversation the viewer takes part in, then mark
    /// the viewer's incoming messages in that page as read.
    async fn get_messages(
        &self,
        viewer_id: Uuid,
        conversation_id: &str,
        query: HistoryQueryDto,
    ) -> Result<ConversationHistory, ConversationError>;

    /// Every conversation the viewer has exchanged messages in.
    async fn list_conversations(
        &self,
        viewer_id: Uuid,
    ) -> Result<Vec<ConversationOverview>, ConversationError>;
}

/// History query parameters
#[derive(Debug, Clone, Default)]
pub struct HistoryQueryDto {
    /// Message id cursor; empty means newest page
    pub before: Option<String>,
    /// Non-positive or absent means the configured default
    pub limit: Option<i64>,
}

/// One fetched page, as it was before read marking
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    pub conversation_id: ConversationId,
    pub page: MessagePage,
}

#[derive(Debug, Clone)]
pub struct ConversationOverview {
    pub summary: ConversationSummary,
    pub online: bool,
}

/// Conversation service errors
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Invalid conversation ID: {0}")]
    InvalidConversation(String),

    #[error("Not a participant of this conversation")]
    Forbidden,

    #[error("Invalid cursor")]
    InvalidCursor,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<ConversationError> for AppError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::InvalidConversation(msg) => {
                AppError::InvalidConversation(format!("Invalid conversation ID: {}", msg))
            }
            ConversationError::Forbidden => {
                AppError::Forbidden("Not a participant of this conversation".into())
            }
            ConversationError::InvalidCursor => AppError::BadRequest("Invalid cursor".into()),
            ConversationError::Store(e) => e,
        }
    }
}

/// ConversationService implementation
pub struct ConversationServiceImpl {
    store: Arc<dyn ConversationStore>,
    presence: Arc<dyn OnlineUsers>,
    history: HistorySettings,
}

impl ConversationServiceImpl {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        presence: Arc<dyn OnlineUsers>,
        history: HistorySettings,
    ) -> Self {
        Self {
            store,
            presence,
            history,
        }
    }

    fn parse_cursor(before: Option<&str>) -> Result<Option<Uuid>, ConversationError> {
        match before.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::try_parse(raw)
                .map(Some)
                .map_err(|_| ConversationError::InvalidCursor),
        }
    }
}

#[async_trait]
impl ConversationService for ConversationServiceImpl {
    async fn get_messages(
        &self,
        viewer_id: Uuid,
        conversation_id: &str,
        query: HistoryQueryDto,
    ) -> Result<ConversationHistory, ConversationError> {
        let conversation_id: ConversationId = conversation_id
            .parse()
            .map_err(|e: crate::domain::ConversationIdError| {
                ConversationError::InvalidConversation(e.to_string())
            })?;

        if !conversation_id.includes(viewer_id) {
            tracing::info!(
                user_id = %viewer_id,
                conversation_id = %conversation_id,
                "Rejected history access by non-participant"
            );
            return Err(ConversationError::Forbidden);
        }

        let before = Self::parse_cursor(query.before.as_deref())?;
        let limit = self
            .history
            .clamp(query.limit.filter(|l| *l > 0).map(|l| l as usize));

        let page = self
            .store
            .fetch_page(conversation_id, before, limit)
            .await?;

        if let Some(newest) = page.newest() {
            match self
                .store
                .mark_read(conversation_id, viewer_id, newest.id)
                .await
            {
                Ok(changed) => tracing::debug!(
                    user_id = %viewer_id,
                    conversation_id = %conversation_id,
                    changed,
                    "Marked messages read"
                ),
                Err(e) => tracing::warn!(
                    user_id = %viewer_id,
                    conversation_id = %conversation_id,
                    error = %e,
                    "Failed to mark messages read"
                ),
            }
        }

        Ok(ConversationHistory {
            conversation_id,
            page,
        })
    }

    async fn list_conversations(
        &self,
        viewer_id: Uuid,
    ) -> Result<Vec<ConversationOverview>, ConversationError> {
        let summaries = self.store.list_conversations(viewer_id).await?;

        Ok(summaries
            .into_iter()
            .map(|summary| {
                let online = self.presence.is_online(summary.other_user_id);
                ConversationOverview { summary, online }
            })
            .collect())
    }
}
