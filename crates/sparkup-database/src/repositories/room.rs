//! Chat room repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use sparkup_core::error::{AppError, ErrorKind};
use sparkup_core::result::AppResult;
use sparkup_core::types::{MessageId, PageRequest, PageResponse, PostId, UserId};
use sparkup_entity::membership::RoomMembership;
use sparkup_entity::room::{ChatRoom, LatestMessage, RoomOverview};

use super::write_error;
use crate::store::RoomStore;

/// Repository for room lifecycle and room listing.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    /// Create a new room repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoomOverviewRow {
    post_id: PostId,
    name: String,
    created_at: DateTime<Utc>,
    unread_count: i64,
    latest_id: Option<i64>,
    latest_sender_id: Option<i64>,
    latest_sender_name: Option<String>,
    latest_content: Option<String>,
    latest_created_at: Option<DateTime<Utc>>,
}

impl From<RoomOverviewRow> for RoomOverview {
    fn from(row: RoomOverviewRow) -> Self {
        let latest_message = match (
            row.latest_id,
            row.latest_sender_id,
            row.latest_content,
            row.latest_created_at,
        ) {
            (Some(id), Some(sender_id), Some(content), Some(created_at)) => Some(LatestMessage {
                id: MessageId(id),
                sender_id: UserId(sender_id),
                sender_name: row
                    .latest_sender_name
                    .unwrap_or_else(|| "Unknown".to_string()),
                content,
                created_at,
            }),
            _ => None,
        };
        let last_activity = latest_message
            .as_ref()
            .map(|m| m.created_at)
            .or(Some(row.created_at));
        Self {
            post_id: row.post_id,
            name: row.name,
            unread_count: row.unread_count.max(0) as u64,
            latest_message,
            last_activity,
        }
    }
}

#[async_trait]
impl RoomStore for RoomRepository {
    async fn create_room(
        &self,
        post_id: PostId,
        name: &str,
        owner_id: UserId,
    ) -> AppResult<ChatRoom> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let room = sqlx::query_as::<_, ChatRoom>(
            "INSERT INTO chat_rooms (post_id, name) VALUES ($1, $2) \
             RETURNING post_id, name, created_at",
        )
        .bind(post_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, format!("Chat room for post {post_id}")))?;

        sqlx::query("INSERT INTO chat_room_members (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, format!("Owner membership for user {owner_id}")))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit room creation", e)
        })?;

        debug!(post_id = %post_id, owner_id = %owner_id, "Created chat room");
        Ok(room)
    }

    async fn find_room(&self, post_id: PostId) -> AppResult<Option<ChatRoom>> {
        sqlx::query_as::<_, ChatRoom>(
            "SELECT post_id, name, created_at FROM chat_rooms WHERE post_id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find chat room", e))
    }

    async fn rename_room(&self, post_id: PostId, name: &str) -> AppResult<ChatRoom> {
        sqlx::query_as::<_, ChatRoom>(
            "UPDATE chat_rooms SET name = $2 WHERE post_id = $1 \
             RETURNING post_id, name, created_at",
        )
        .bind(post_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rename chat room", e))?
        .ok_or_else(|| AppError::not_found(format!("Chat room {post_id} not found")))
    }

    async fn delete_room(&self, post_id: PostId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM chat_rooms WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete chat room", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_member(&self, post_id: PostId, user_id: UserId) -> AppResult<RoomMembership> {
        sqlx::query_as::<_, RoomMembership>(
            "INSERT INTO chat_room_members (post_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (post_id, user_id) DO UPDATE SET joined_at = chat_room_members.joined_at \
             RETURNING post_id, user_id, joined_at",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, format!("Membership of user {user_id} in room {post_id}")))
    }

    async fn remove_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM chat_room_members WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to remove member", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn rooms_for_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RoomOverview>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_room_members WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count chat rooms", e)
                })?;

        let rows = sqlx::query_as::<_, RoomOverviewRow>(
            "SELECT r.post_id, r.name, r.created_at, \
                    (SELECT COUNT(*) FROM chat_messages m \
                      WHERE m.post_id = r.post_id \
                        AND NOT EXISTS (SELECT 1 FROM chat_message_reads rd \
                                         WHERE rd.message_id = m.id AND rd.user_id = $1)) AS unread_count, \
                    lm.id AS latest_id, lm.sender_id AS latest_sender_id, \
                    lp.nickname AS latest_sender_name, lm.content AS latest_content, \
                    lm.created_at AS latest_created_at \
             FROM chat_room_members cm \
             JOIN chat_rooms r ON r.post_id = cm.post_id \
             LEFT JOIN LATERAL (SELECT id, sender_id, content, created_at FROM chat_messages \
                                 WHERE post_id = r.post_id ORDER BY id DESC LIMIT 1) lm ON TRUE \
             LEFT JOIN profiles lp ON lp.user_id = lm.sender_id \
             WHERE cm.user_id = $1 \
             ORDER BY COALESCE(lm.created_at, r.created_at) DESC, r.post_id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list chat rooms", e))?;

        let items = rows.into_iter().map(RoomOverview::from).collect();
        Ok(PageResponse::new(items, page, total.max(0) as u64))
    }
}
