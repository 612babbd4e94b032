//! Chat message entity model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sparkup_core::types::{MessageId, PostId, UserId};

/// A persisted chat message together with its read-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Store-assigned, monotonically increasing id.
    pub id: MessageId,
    /// The room (post).
    pub post_id: PostId,
    /// The author.
    pub sender_id: UserId,
    /// Author display name at read time.
    pub sender_name: String,
    /// Message text.
    pub content: String,
    /// When the message was stored.
    #[serde(with = "sparkup_core::types::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Users who have read the message. Only ever grows.
    pub read_users: BTreeSet<UserId>,
}

impl ChatMessage {
    /// Check if `user` has read this message.
    pub fn is_read_by(&self, user: UserId) -> bool {
        self.read_users.contains(&user)
    }
}

/// Input for persisting a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub post_id: PostId,
    pub sender_id: UserId,
    pub content: String,
}
