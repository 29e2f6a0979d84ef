//! User Repository Implementation

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{PresenceStatus, UserListQuery, UserPage, UserRepository, UserSummary};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// PostgreSQL user repository.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    status: String,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserSummary {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            status: row.status,
            last_seen: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn update_status(
        &self,
        user_id: Uuid,
        username: &str,
        status: PresenceStatus,
    ) -> Result<(), AppError> {
        let start = Instant::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, status, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        metrics::record_db_query("update_status", "users", start.elapsed().as_secs_f64());
        Ok(())
    }

    async fn list_users(&self, viewer_id: Uuid, query: UserListQuery) -> Result<UserPage, AppError> {
        let start = Instant::now();
        let pattern = query.search.as_deref().map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE id <> $1 AND ($2::TEXT IS NULL OR username ILIKE $2)
            "#,
        )
        .bind(viewer_id)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, status, updated_at FROM users
            WHERE id <> $1 AND ($2::TEXT IS NULL OR username ILIKE $2)
            ORDER BY username ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(viewer_id)
        .bind(pattern.as_deref())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        metrics::record_db_query("list_users", "users", start.elapsed().as_secs_f64());

        Ok(UserPage {
            users: rows.into_iter().map(UserSummary::from).collect(),
            total,
        })
    }
}
