//! Room membership repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use sparkup_core::error::{AppError, ErrorKind};
use sparkup_core::result::AppResult;
use sparkup_core::types::{PostId, UserId};
use sparkup_entity::membership::{MemberProfile, ParticipationLevel, RoomMember};

use crate::store::MembershipStore;

/// Repository for membership and profile lookups.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Create a new membership repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MemberProfileRow {
    user_id: UserId,
    nickname: Option<String>,
    rating: f64,
    joined_at: DateTime<Utc>,
    is_host: bool,
    participations: i64,
}

#[async_trait]
impl MembershipStore for MembershipRepository {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up user", e))
    }

    async fn room_members(&self, post_id: PostId) -> AppResult<Vec<RoomMember>> {
        let rows: Vec<(UserId, Option<String>)> = sqlx::query_as(
            "SELECT cm.user_id, p.nickname FROM chat_room_members cm \
             LEFT JOIN profiles p ON p.user_id = cm.user_id \
             WHERE cm.post_id = $1 ORDER BY cm.user_id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load room members", e))?;

        Ok(rows
            .into_iter()
            .map(|(user_id, nickname)| RoomMember::new(user_id, nickname))
            .collect())
    }

    async fn is_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM chat_room_members WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check membership", e))
    }

    async fn member_profiles(&self, post_id: PostId) -> AppResult<Vec<MemberProfile>> {
        let rows = sqlx::query_as::<_, MemberProfileRow>(
            "SELECT cm.user_id, p.nickname, COALESCE(p.rating, 0)::DOUBLE PRECISION AS rating, \
                    cm.joined_at, (po.owner_id = cm.user_id) AS is_host, \
                    (SELECT COUNT(*) FROM chat_room_members o \
                      WHERE o.user_id = cm.user_id AND o.post_id <> cm.post_id) AS participations \
             FROM chat_room_members cm \
             JOIN posts po ON po.id = cm.post_id \
             LEFT JOIN profiles p ON p.user_id = cm.user_id \
             WHERE cm.post_id = $1",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load member profiles", e)
        })?;

        let mut members: Vec<MemberProfile> = rows
            .into_iter()
            .map(|row| {
                let participations = row.participations.max(0) as u64;
                MemberProfile {
                    user_id: row.user_id,
                    display_name: RoomMember::new(row.user_id, row.nickname).display_name,
                    rating: row.rating,
                    joined_at: row.joined_at,
                    is_host: row.is_host,
                    participations,
                    level: ParticipationLevel::from_participations(participations),
                }
            })
            .collect();
        MemberProfile::sort_for_listing(&mut members);
        Ok(members)
    }
}
