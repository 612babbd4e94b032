//! Message history and unread counts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sparkup_core::error::AppError;
use sparkup_core::result::AppResult;
use sparkup_core::types::{MessageId, PostId, UserId};
use sparkup_database::store::{MembershipStore, MessageStore};
use sparkup_entity::message::ChatMessage;

/// Page size when the caller gives none.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Largest page a caller can request.
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// A history request.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Room to read.
    pub post_id: PostId,
    /// Requesting user; must be a member.
    pub user_id: UserId,
    /// Only messages with a lower id. Absent for the initial load.
    pub before_id: Option<MessageId>,
    /// Requested page size.
    pub limit: Option<i64>,
}

impl HistoryQuery {
    /// Page size after defaulting and clamping into `1..=100`.
    pub fn effective_limit(&self) -> u32 {
        match self.limit {
            None => DEFAULT_HISTORY_LIMIT,
            Some(n) => n.clamp(1, i64::from(MAX_HISTORY_LIMIT)) as u32,
        }
    }
}

/// One page of history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    /// Whether older messages exist beyond this page.
    pub has_more: bool,
    /// Lowest id on this page; pass it as `before_id` for the next one.
    pub oldest_id: Option<MessageId>,
}

/// Paginated history with read marking, and unread counts.
#[derive(Clone)]
pub struct HistoryService {
    members: Arc<dyn MembershipStore>,
    messages: Arc<dyn MessageStore>,
}

impl std::fmt::Debug for HistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryService").finish()
    }
}

impl HistoryService {
    /// Creates a new history service.
    pub fn new(members: Arc<dyn MembershipStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self { members, messages }
    }

    /// Load one page of a room's history.
    ///
    /// The initial load (no `before_id`) marks every returned message read
    /// for the requester in one transaction; the returned read-sets already
    /// include them. Backward pages never change read state.
    pub async fn history(&self, query: HistoryQuery) -> AppResult<MessagePage> {
        if !self.members.is_member(query.post_id, query.user_id).await? {
            warn!(
                post_id = %query.post_id,
                user_id = %query.user_id,
                "History requested by non-member"
            );
            return Err(AppError::authorization(
                "Not authorized to access this chat room",
            ));
        }

        let limit = query.effective_limit();
        let mut messages = self
            .messages
            .message_page(query.post_id, query.before_id, limit + 1)
            .await?;

        let has_more = messages.len() > limit as usize;
        messages.truncate(limit as usize);
        let oldest_id = messages.iter().map(|m| m.id).min();

        if query.before_id.is_none() {
            let unread: Vec<MessageId> = messages
                .iter()
                .filter(|m| !m.is_read_by(query.user_id))
                .map(|m| m.id)
                .collect();
            if !unread.is_empty() {
                let marked = self.messages.mark_read(query.user_id, &unread).await?;
                debug!(
                    post_id = %query.post_id,
                    user_id = %query.user_id,
                    marked,
                    "Marked messages read"
                );
                for message in &mut messages {
                    message.read_users.insert(query.user_id);
                }
            }
        }

        Ok(MessagePage {
            messages,
            has_more,
            oldest_id,
        })
    }

    /// Messages in the room the user has not read.
    pub async fn unread_count(&self, post_id: PostId, user_id: UserId) -> AppResult<u64> {
        self.messages.count_unread(post_id, user_id).await
    }
}
