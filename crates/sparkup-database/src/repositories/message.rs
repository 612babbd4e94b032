//! Chat message repository implementation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use sparkup_core::error::{AppError, ErrorKind};
use sparkup_core::result::AppResult;
use sparkup_core::types::{MessageId, PostId, UserId};
use sparkup_entity::membership::RoomMember;
use sparkup_entity::message::{ChatMessage, NewMessage};

use super::write_error;
use crate::store::MessageStore;

/// Repository for message persistence and read tracking.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: MessageId,
    post_id: PostId,
    sender_id: UserId,
    sender_name: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
    read_users: Vec<i64>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            sender_id: row.sender_id,
            sender_name: RoomMember::new(row.sender_id, row.sender_name).display_name,
            content: row.content,
            created_at: row.created_at,
            read_users: row.read_users.into_iter().map(UserId).collect(),
        }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert_message(&self, message: NewMessage) -> AppResult<ChatMessage> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let (id, created_at): (MessageId, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO chat_messages (post_id, sender_id, content) VALUES ($1, $2, $3) \
             RETURNING id, created_at",
        )
        .bind(message.post_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, format!("Message in room {}", message.post_id)))?;

        sqlx::query("INSERT INTO chat_message_reads (message_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(message.sender_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to seed read-set", e)
            })?;

        let nickname: Option<String> =
            sqlx::query_scalar("SELECT nickname FROM profiles WHERE user_id = $1")
                .bind(message.sender_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to load sender profile", e)
                })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit message", e)
        })?;

        debug!(message_id = %id, post_id = %message.post_id, "Stored chat message");

        Ok(ChatMessage {
            id,
            post_id: message.post_id,
            sender_id: message.sender_id,
            sender_name: RoomMember::new(message.sender_id, nickname).display_name,
            content: message.content,
            created_at,
            read_users: BTreeSet::from([message.sender_id]),
        })
    }

    async fn message_page(
        &self,
        post_id: PostId,
        before_id: Option<MessageId>,
        fetch_limit: u32,
    ) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT m.id, m.post_id, m.sender_id, p.nickname AS sender_name, m.content, m.created_at, \
                    ARRAY(SELECT r.user_id FROM chat_message_reads r \
                           WHERE r.message_id = m.id ORDER BY r.user_id) AS read_users \
             FROM chat_messages m \
             LEFT JOIN profiles p ON p.user_id = m.sender_id \
             WHERE m.post_id = $1 AND ($2::BIGINT IS NULL OR m.id < $2) \
             ORDER BY m.id DESC \
             LIMIT $3",
        )
        .bind(post_id)
        .bind(before_id.map(i64::from))
        .bind(i64::from(fetch_limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load messages", e))?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn mark_read(&self, user_id: UserId, ids: &[MessageId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let result = sqlx::query(
            "INSERT INTO chat_message_reads (message_id, user_id) \
             SELECT UNNEST($1::BIGINT[]), $2 \
             ON CONFLICT (message_id, user_id) DO NOTHING",
        )
        .bind(ids)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark messages read", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit read marks", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, post_id: PostId, user_id: UserId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_messages m \
             WHERE m.post_id = $1 \
               AND NOT EXISTS (SELECT 1 FROM chat_message_reads r \
                                WHERE r.message_id = m.id AND r.user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))?;
        Ok(count.max(0) as u64)
    }
}
