//! Frame parsing and `send_message` validation.

use sparkup_core::error::AppError;
use sparkup_entity::message::NewMessage;

use crate::dispatch::error::DispatchError;

use super::types::{InboundMessage, SendMessageRequest};

/// Maximum accepted frame size in bytes.
const MAX_FRAME_SIZE: usize = 65_536;

/// Parse a raw text frame.
pub fn parse_inbound(raw: &str) -> Result<InboundMessage, DispatchError> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(DispatchError::Malformed(AppError::validation(format!(
            "Frame exceeds maximum size of {MAX_FRAME_SIZE} bytes"
        ))));
    }
    if raw.trim().is_empty() {
        return Err(DispatchError::Malformed(AppError::validation("Empty frame")));
    }
    serde_json::from_str(raw).map_err(|e| DispatchError::Malformed(AppError::from(e)))
}

/// Require `post_id`, `sender_id`, and non-empty `content`.
pub fn validate_send(request: SendMessageRequest) -> Result<NewMessage, DispatchError> {
    match request {
        SendMessageRequest {
            post_id: Some(post_id),
            sender_id: Some(sender_id),
            content: Some(content),
        } if !content.is_empty() => Ok(NewMessage {
            post_id,
            sender_id,
            content,
        }),
        _ => Err(DispatchError::MissingFields),
    }
}
