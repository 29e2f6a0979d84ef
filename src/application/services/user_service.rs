//! User Service
//!
//! Paged, searchable user directory with live online flags.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::OnlineUsers;
use crate::domain::{UserListQuery, UserRepository, UserSummary};
use crate::shared::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// One page of every user except the viewer, ordered by username.
    async fn list_users(
        &self,
        viewer_id: Uuid,
        query: DirectoryQueryDto,
    ) -> Result<UserDirectory, AppError>;
}

/// Directory query parameters. Non-positive or absent values mean the
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct DirectoryQueryDto {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub user: UserSummary,
    pub online: bool,
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    pub entries: Vec<DirectoryEntry>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    /// Absent on the last page
    pub next_page: Option<i64>,
}

/// UserService implementation
pub struct UserServiceImpl {
    users: Arc<dyn UserRepository>,
    presence: Arc<dyn OnlineUsers>,
}

impl UserServiceImpl {
    pub fn new(users: Arc<dyn UserRepository>, presence: Arc<dyn OnlineUsers>) -> Self {
        Self { users, presence }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn list_users(
        &self,
        viewer_id: Uuid,
        query: DirectoryQueryDto,
    ) -> Result<UserDirectory, AppError> {
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .map_or(DEFAULT_PAGE_SIZE, |l| l.min(MAX_PAGE_SIZE));

        let result = self
            .users
            .list_users(
                viewer_id,
                UserListQuery {
                    search: query.search,
                    offset: (page - 1).saturating_mul(limit),
                    limit,
                },
            )
            .await?;

        let next_page = (page.saturating_mul(limit) < result.total).then_some(page + 1);

        tracing::debug!(user_id = %viewer_id, page, limit, total = result.total, "Listed users");

        Ok(UserDirectory {
            entries: result
                .users
                .into_iter()
                .map(|user| {
                    let online = self.presence.is_online(user.id);
                    DirectoryEntry { user, online }
                })
                .collect(),
            total: result.total,
            page,
            limit,
            next_page,
        })
    }
}
