//! Conversation Store Implementation
//!
//! PostgreSQL implementation of direct message persistence with keyset
//! pagination over `(created_at, id)`.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    ConversationId, ConversationStore, ConversationSummary, DirectMessage, MessagePage,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// PostgreSQL conversation store.
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    /// Creates a new PgConversationStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    content: String,
    delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> DirectMessage {
        DirectMessage {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            content: self.content,
            delivered: self.delivered,
            delivered_at: self.delivered_at,
            read: self.read,
            read_at: self.read_at,
            created_at: self.created_at,
        }
    }
}

/// Row type for the conversation list query.
#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    last: MessageRow,
    other_username: Option<String>,
    other_status: Option<String>,
    unread_count: i64,
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn append(&self, message: &DirectMessage) -> Result<(), AppError> {
        let start = Instant::now();

        sqlx::query(
            r#"
            INSERT INTO direct_messages
                (id, sender_id, recipient_id, content, delivered, read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, FALSE, $5)
            "#,
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        metrics::record_db_query("insert", "direct_messages", start.elapsed().as_secs_f64());
        Ok(())
    }

    async fn mark_delivered(&self, message_id: Uuid) -> Result<bool, AppError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE direct_messages
            SET delivered = TRUE, delivered_at = NOW()
            WHERE id = $1 AND delivered = FALSE
            "#,
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        metrics::record_db_query("mark_delivered", "direct_messages", start.elapsed().as_secs_f64());
        Ok(result.rows_affected() > 0)
    }

    /// Keyset pagination, newest first.
    ///
    /// Requests `limit + 1` rows so `has_more` needs no second count query.
    async fn fetch_page(
        &self,
        conversation_id: ConversationId,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<MessagePage, AppError> {
        let start = Instant::now();
        let limit = limit.max(1);
        let (low, high) = conversation_id.participants();

        let cursor: Option<(DateTime<Utc>, Uuid)> = match before {
            Some(cursor_id) => {
                let key = sqlx::query_as::<_, (DateTime<Utc>, Uuid)>(
                    r#"
                    SELECT created_at, id
                    FROM direct_messages
                    WHERE id = $1
                      AND ((sender_id = $2 AND recipient_id = $3)
                        OR (sender_id = $3 AND recipient_id = $2))
                    "#,
                )
                .bind(cursor_id)
                .bind(low)
                .bind(high)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::BadRequest("Invalid before cursor".into()))?;
                Some(key)
            }
            None => None,
        };

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, recipient_id, content,
                   delivered, delivered_at, read, read_at, created_at
            FROM direct_messages
            WHERE ((sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1))
              AND ($3::timestamptz IS NULL OR (created_at, id) < ($3, $4))
            ORDER BY created_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(low)
        .bind(high)
        .bind(cursor.map(|(created_at, _)| created_at))
        .bind(cursor.map(|(_, id)| id))
        .bind((limit + 1) as i64)
        .fetch_all(&self.pool)
        .await?;

        metrics::record_db_query("fetch_page", "direct_messages", start.elapsed().as_secs_f64());

        let messages = rows.into_iter().map(MessageRow::into_message).collect();
        Ok(MessagePage::from_overfetched(messages, limit))
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader_id: Uuid,
        through_message_id: Uuid,
    ) -> Result<u64, AppError> {
        let sender_id = conversation_id.counterpart(reader_id).ok_or_else(|| {
            AppError::Forbidden("User is not part of this conversation".into())
        })?;
        let start = Instant::now();

        // An unknown threshold makes the row comparison NULL, touching nothing.
        let result = sqlx::query(
            r#"
            UPDATE direct_messages
            SET read = TRUE, read_at = NOW()
            WHERE sender_id = $1
              AND recipient_id = $2
              AND read = FALSE
              AND (created_at, id) <= (
                  SELECT created_at, id FROM direct_messages WHERE id = $3
              )
            "#,
        )
        .bind(sender_id)
        .bind(reader_id)
        .bind(through_message_id)
        .execute(&self.pool)
        .await?;

        metrics::record_db_query("mark_read", "direct_messages", start.elapsed().as_secs_f64());
        Ok(result.rows_affected())
    }

    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError> {
        let start = Instant::now();

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            WITH ranked AS (
                SELECT dm.*,
                       CASE WHEN dm.sender_id = $1 THEN dm.recipient_id
                            ELSE dm.sender_id END AS other_user_id,
                       ROW_NUMBER() OVER (
                           PARTITION BY CASE WHEN dm.sender_id = $1 THEN dm.recipient_id
                                             ELSE dm.sender_id END
                           ORDER BY dm.created_at DESC, dm.id DESC
                       ) AS row_num
                FROM direct_messages dm
                WHERE dm.sender_id = $1 OR dm.recipient_id = $1
            ),
            unread AS (
                SELECT sender_id AS other_user_id, COUNT(*) AS unread_count
                FROM direct_messages
                WHERE recipient_id = $1 AND read = FALSE
                GROUP BY sender_id
            )
            SELECT r.id, r.sender_id, r.recipient_id, r.content,
                   r.delivered, r.delivered_at, r.read, r.read_at, r.created_at,
                   u.username AS other_username,
                   u.status AS other_status,
                   COALESCE(uc.unread_count, 0) AS unread_count
            FROM ranked r
            LEFT JOIN users u ON u.id = r.other_user_id
            LEFT JOIN unread uc ON uc.other_user_id = r.other_user_id
            WHERE r.row_num = 1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        metrics::record_db_query("list_conversations", "direct_messages", start.elapsed().as_secs_f64());

        Ok(rows
            .into_iter()
            .map(|row| {
                let last = row.last.into_message();
                let mut summary =
                    ConversationSummary::from_last_message(user_id, &last, row.unread_count);
                summary.other_username = row.other_username;
                summary.other_status = row.other_status;
                summary
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
