//! Chat room entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sparkup_core::types::PostId;

/// A chat room. Exactly one room exists per post, keyed by the post id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatRoom {
    /// The post this room belongs to.
    pub post_id: PostId,
    /// Display name of the room.
    pub name: String,
    /// When the room was created.
    #[serde(with = "sparkup_core::types::timestamp")]
    pub created_at: DateTime<Utc>,
}
