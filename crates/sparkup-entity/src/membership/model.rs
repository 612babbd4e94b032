//! Room membership entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sparkup_core::types::{PostId, UserId};

/// Display name used when a member has no profile.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Durable record that a user belongs to a room.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomMembership {
    /// The room (post).
    pub post_id: PostId,
    /// The member.
    pub user_id: UserId,
    /// When the user joined the room.
    #[serde(with = "sparkup_core::types::timestamp")]
    pub joined_at: DateTime<Utc>,
}

/// A member as seen by the real-time path: id plus display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomMember {
    pub user_id: UserId,
    pub display_name: String,
}

impl RoomMember {
    /// Build a member, falling back to [`UNKNOWN_DISPLAY_NAME`] without a nickname.
    pub fn new(user_id: UserId, nickname: Option<String>) -> Self {
        Self {
            user_id,
            display_name: nickname.unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_nickname_falls_back() {
        let member = RoomMember::new(UserId(3), None);
        assert_eq!(member.display_name, "Unknown");
        let member = RoomMember::new(UserId(3), Some("mina".into()));
        assert_eq!(member.display_name, "mina");
    }
}
