//! Request DTOs.

use serde::{Deserialize, Serialize};

use sparkup_core::error::AppError;
use sparkup_core::types::{MessageId, PostId, UserId};
use sparkup_service::chat::HistoryQuery;

/// Body of `POST /api/chat/messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageHistoryRequest {
    /// Room to read.
    pub post_id: Option<PostId>,
    /// Requesting user.
    pub user_id: Option<UserId>,
    /// Load messages older than this id.
    pub before_id: Option<MessageId>,
    /// Page size, default 50, at most 100.
    pub limit: Option<i64>,
}

impl MessageHistoryRequest {
    /// Check required fields and build the service query.
    pub fn into_query(self) -> Result<HistoryQuery, AppError> {
        let (Some(post_id), Some(user_id)) = (self.post_id, self.user_id) else {
            return Err(AppError::validation("Missing required fields"));
        };
        Ok(HistoryQuery {
            post_id,
            user_id,
            before_id: self.before_id,
            limit: self.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let req: MessageHistoryRequest = serde_json::from_str(r#"{"post_id": 42}"#).unwrap();
        let err = req.into_query().unwrap_err();
        assert_eq!(err.message, "Missing required fields");
    }

    #[test]
    fn test_full_request() {
        let req: MessageHistoryRequest =
            serde_json::from_str(r#"{"post_id": 42, "user_id": 7, "before_id": 90, "limit": 10}"#)
                .unwrap();
        let query = req.into_query().unwrap();
        assert_eq!(query.post_id, PostId(42));
        assert_eq!(query.before_id, Some(MessageId(90)));
        assert_eq!(query.effective_limit(), 10);
    }
}
