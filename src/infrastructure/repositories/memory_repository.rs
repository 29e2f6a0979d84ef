//! In-Memory Store
//!
//! Process-local implementation of the conversation and user
//! contracts. Backs the `memory` storage backend (single-node development
//! setups) and the test suites.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    ConversationId, ConversationStore, ConversationSummary, DirectMessage, MessagePage,
    PresenceStatus, UserListQuery, UserPage, UserRepository, UserSummary,
};
use crate::shared::error::AppError;

/// In-memory message store.
///
/// Each conversation thread is kept sorted ascending by `(created_at, id)`;
/// paging walks it from the end.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    threads: DashMap<ConversationId, Vec<DirectMessage>>,
    /// message id -> conversation, for single-message updates
    index: DashMap<Uuid, ConversationId>,
    users: DashMap<Uuid, UserSummary>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a single message by ID.
    pub fn message(&self, message_id: Uuid) -> Option<DirectMessage> {
        let conversation_id = *self.index.get(&message_id)?;
        self.threads
            .get(&conversation_id)?
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
    }

    /// Last recorded status of a user.
    pub fn status_of(&self, user_id: Uuid) -> Option<PresenceStatus> {
        self.users.get(&user_id)?.status.parse().ok()
    }

    /// Total number of stored messages.
    pub fn message_count(&self) -> usize {
        self.index.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(&self, message: &DirectMessage) -> Result<(), AppError> {
        if self.index.contains_key(&message.id) {
            return Err(AppError::Internal(format!(
                "Duplicate message id {}",
                message.id
            )));
        }

        let mut row = message.clone();
        row.delivered = false;
        row.delivered_at = None;
        row.read = false;
        row.read_at = None;

        let conversation_id = row.conversation_id();
        let key = row.page_key();

        {
            let mut thread = self.threads.entry(conversation_id).or_default();
            let at = thread.partition_point(|m| m.page_key() < key);
            thread.insert(at, row);
        }
        self.index.insert(message.id, conversation_id);

        Ok(())
    }

    async fn mark_delivered(&self, message_id: Uuid) -> Result<bool, AppError> {
        let Some(conversation_id) = self.index.get(&message_id).map(|c| *c) else {
            return Ok(false);
        };

        let Some(mut thread) = self.threads.get_mut(&conversation_id) else {
            return Ok(false);
        };

        match thread.iter_mut().find(|m| m.id == message_id && !m.delivered) {
            Some(message) => {
                message.delivered = true;
                message.delivered_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch_page(
        &self,
        conversation_id: ConversationId,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<MessagePage, AppError> {
        let limit = limit.max(1);

        let Some(thread) = self.threads.get(&conversation_id) else {
            return match before {
                Some(_) => Err(AppError::BadRequest("Invalid before cursor".into())),
                None => Ok(MessagePage::default()),
            };
        };

        let upper = match before {
            Some(cursor) => Some(
                thread
                    .iter()
                    .find(|m| m.id == cursor)
                    .map(DirectMessage::page_key)
                    .ok_or_else(|| AppError::BadRequest("Invalid before cursor".into()))?,
            ),
            None => None,
        };

        let rows: Vec<DirectMessage> = thread
            .iter()
            .rev()
            .filter(|m| upper.map_or(true, |key| m.page_key() < key))
            .take(limit + 1)
            .cloned()
            .collect();

        Ok(MessagePage::from_overfetched(rows, limit))
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader_id: Uuid,
        through_message_id: Uuid,
    ) -> Result<u64, AppError> {
        if !conversation_id.includes(reader_id) {
            return Err(AppError::Forbidden(
                "User is not part of this conversation".into(),
            ));
        }

        let Some(mut thread) = self.threads.get_mut(&conversation_id) else {
            return Ok(0);
        };

        let Some(threshold) = thread
            .iter()
            .find(|m| m.id == through_message_id)
            .map(DirectMessage::page_key)
        else {
            return Ok(0);
        };

        let now = Utc::now();
        let mut changed = 0;
        for message in thread
            .iter_mut()
            .filter(|m| m.recipient_id == reader_id && !m.read && m.page_key() <= threshold)
        {
            message.read = true;
            message.read_at = Some(now);
            changed += 1;
        }

        Ok(changed)
    }

    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError> {
        let mut summaries: Vec<ConversationSummary> = self
            .threads
            .iter()
            .filter(|entry| entry.key().includes(user_id))
            .filter_map(|entry| {
                let thread = entry.value();
                let last = thread.last()?;
                let unread = thread
                    .iter()
                    .filter(|m| m.recipient_id == user_id && !m.read)
                    .count() as i64;
                Some(ConversationSummary::from_last_message(user_id, last, unread))
            })
            .collect();

        for summary in &mut summaries {
            if let Some(user) = self.users.get(&summary.other_user_id) {
                summary.other_username = Some(user.username.clone());
                summary.other_status = Some(user.status.clone());
            }
        }

        summaries.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| b.last_message_id.cmp(&a.last_message_id))
        });

        Ok(summaries)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn update_status(
        &self,
        user_id: Uuid,
        username: &str,
        status: PresenceStatus,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        self.users
            .entry(user_id)
            .and_modify(|user| {
                user.status = status.as_str().to_string();
                user.last_seen = now;
            })
            .or_insert_with(|| UserSummary {
                id: user_id,
                username: username.to_string(),
                status: status.as_str().to_string(),
                last_seen: now,
            });
        Ok(())
    }

    async fn list_users(&self, viewer_id: Uuid, query: UserListQuery) -> Result<UserPage, AppError> {
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<UserSummary> = self
            .users
            .iter()
            .filter(|entry| *entry.key() != viewer_id)
            .filter(|entry| {
                needle
                    .as_deref()
                    .map_or(true, |n| entry.username.to_lowercase().contains(n))
            })
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));

        let total = matches.len() as i64;
        let users = matches
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();

        Ok(UserPage { users, total })
    }
}
