//! User directory and status persistence contract.
//!
//! User accounts belong to the authentication service. This crate keeps the
//! `users.status` column in step with live connections and serves a paged,
//! searchable directory over the same table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::value_objects::PresenceStatus;
use crate::shared::error::AppError;

/// One user directory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    /// Last persisted status, as stored
    pub status: String,
    /// When the status last changed
    pub last_seen: DateTime<Utc>,
}

/// Directory window and optional case-insensitive username filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

/// One directory page plus the number of rows matching the filter.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    pub total: i64,
}

/// Repository trait for user status and the user directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Record `status` for `user_id`, creating the directory row on first
    /// sight.
    ///
    /// Callers treat failures as non-fatal.
    async fn update_status(
        &self,
        user_id: Uuid,
        username: &str,
        status: PresenceStatus,
    ) -> Result<(), AppError>;

    /// Users other than `viewer_id`, ordered by username.
    async fn list_users(&self, viewer_id: Uuid, query: UserListQuery) -> Result<UserPage, AppError>;
}
