//! Store contracts the chat core depends on.
//!
//! Each trait has a PostgreSQL implementation in
//! [`crate::repositories`] and an in-process one in `crate::memory`.
//! Every write that touches more than one row commits as one unit.

use async_trait::async_trait;

use sparkup_core::result::AppResult;
use sparkup_core::types::{MessageId, PageRequest, PageResponse, PostId, UserId};
use sparkup_entity::membership::{MemberProfile, RoomMember, RoomMembership};
use sparkup_entity::message::{ChatMessage, NewMessage};
use sparkup_entity::room::{ChatRoom, RoomOverview};

/// Room lifecycle and per-user room listing.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Create a room and the owner's membership in one transaction.
    ///
    /// Fails with a conflict if the post already has a room.
    async fn create_room(&self, post_id: PostId, name: &str, owner_id: UserId)
    -> AppResult<ChatRoom>;

    /// Look up a room.
    async fn find_room(&self, post_id: PostId) -> AppResult<Option<ChatRoom>>;

    /// Change a room's display name.
    async fn rename_room(&self, post_id: PostId, name: &str) -> AppResult<ChatRoom>;

    /// Delete a room together with its memberships, messages, and read marks.
    /// Returns `true` if the room existed.
    async fn delete_room(&self, post_id: PostId) -> AppResult<bool>;

    /// Add a member. Adding an existing member returns the existing record.
    async fn add_member(&self, post_id: PostId, user_id: UserId) -> AppResult<RoomMembership>;

    /// Remove a member. Returns `true` if the membership existed.
    async fn remove_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool>;

    /// Rooms the user belongs to, most recently active first, with unread
    /// counts and the latest message.
    async fn rooms_for_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RoomOverview>>;
}

/// Membership and profile lookups.
#[async_trait]
pub trait MembershipStore: Send + Sync + 'static {
    /// Check whether a user account exists.
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool>;

    /// Current members of a room with display names, ordered by user id.
    async fn room_members(&self, post_id: PostId) -> AppResult<Vec<RoomMember>>;

    /// Check whether a user is currently a member of a room.
    async fn is_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool>;

    /// Members with rating, join time, host flag, and participation count.
    async fn member_profiles(&self, post_id: PostId) -> AppResult<Vec<MemberProfile>>;
}

/// Message persistence and read tracking.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persist a message with its read-set seeded to the sender, atomically.
    async fn insert_message(&self, message: NewMessage) -> AppResult<ChatMessage>;

    /// Up to `fetch_limit` messages of a room, newest first, strictly older
    /// than `before_id` when given.
    async fn message_page(
        &self,
        post_id: PostId,
        before_id: Option<MessageId>,
        fetch_limit: u32,
    ) -> AppResult<Vec<ChatMessage>>;

    /// Add `user_id` to the read-set of every message in `ids`, in one
    /// transaction. Returns how many read-sets actually grew.
    async fn mark_read(&self, user_id: UserId, ids: &[MessageId]) -> AppResult<u64>;

    /// Messages in the room whose read-set lacks the user.
    async fn count_unread(&self, post_id: PostId, user_id: UserId) -> AppResult<u64>;
}
