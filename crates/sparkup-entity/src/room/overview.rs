//! Per-user room list entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sparkup_core::types::{MessageId, PostId, UserId};

/// Summary of the most recent message in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    #[serde(with = "sparkup_core::types::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One entry in a user's room list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomOverview {
    /// Room (post) identifier.
    pub post_id: PostId,
    /// Room display name.
    pub name: String,
    /// Messages in the room the user has not read.
    pub unread_count: u64,
    /// Latest message, absent for an empty room.
    pub latest_message: Option<LatestMessage>,
    /// Ordering key: latest message time, or room creation time.
    #[serde(skip)]
    pub last_activity: Option<DateTime<Utc>>,
}
