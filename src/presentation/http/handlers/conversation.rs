//! Conversation Handlers
//!
//! History REST endpoints. Both require an authenticated caller.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use crate::application::dto::request::HistoryQuery;
use crate::application::dto::response::{ConversationListResponse, MessageListResponse};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// List the caller's conversations, newest activity first
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let overviews = state.conversations.list_conversations(auth.user_id).await?;

    Ok(Json(overviews.into_iter().collect()))
}

/// Fetch one page of a conversation and mark the caller's incoming
/// messages in it as read
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessageListResponse>, AppError> {
    let history = state
        .conversations
        .get_messages(auth.user_id, &conversation_id, query.into())
        .await?;

    tracing::debug!(
        user_id = %auth.user_id,
        conversation_id = %history.conversation_id,
        count = history.page.messages.len(),
        "History page served"
    );

    Ok(Json(history.into()))
}
