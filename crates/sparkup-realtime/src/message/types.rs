//! Inbound and outbound WebSocket frame definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sparkup_core::types::{MessageId, PostId, UserId};

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Post a message to a room.
    SendMessage(SendMessageRequest),
}

/// Body of a `send_message` frame. Fields are optional on the wire so a
/// missing one can be reported as such instead of as a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// A message was posted in one of the recipient's rooms.
    NewMessage {
        id: MessageId,
        post_id: PostId,
        sender_id: UserId,
        sender_name: String,
        content: String,
        #[serde(with = "sparkup_core::types::timestamp")]
        created_at: DateTime<Utc>,
    },
    /// A request from this connection failed.
    Error {
        /// Human-readable cause.
        message: String,
    },
}

impl OutboundMessage {
    /// Build an error frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
