//! Room listing and room lifecycle.

use std::sync::Arc;

use tracing::info;

use sparkup_core::error::AppError;
use sparkup_core::result::AppResult;
use sparkup_core::types::{PageRequest, PageResponse, PostId, UserId};
use sparkup_database::store::{MembershipStore, RoomStore};
use sparkup_entity::membership::RoomMembership;
use sparkup_entity::room::{ChatRoom, RoomOverview};

/// Longest accepted room name, in characters.
pub const MAX_ROOM_NAME_LEN: usize = 100;

/// Room queries and lifecycle operations.
#[derive(Clone)]
pub struct RoomService {
    rooms: Arc<dyn RoomStore>,
    members: Arc<dyn MembershipStore>,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService").finish()
    }
}

impl RoomService {
    /// Creates a new room service.
    pub fn new(rooms: Arc<dyn RoomStore>, members: Arc<dyn MembershipStore>) -> Self {
        Self { rooms, members }
    }

    /// Rooms the user belongs to, most recently active first.
    pub async fn list_rooms(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> AppResult<PageResponse<RoomOverview>> {
        if !self.members.user_exists(user_id).await? {
            return Err(AppError::not_found("User not found"));
        }
        self.rooms.rooms_for_user(user_id, &page).await
    }

    /// Open the chat room for a post, with its owner as the first member.
    pub async fn create_room(
        &self,
        post_id: PostId,
        name: &str,
        owner_id: UserId,
    ) -> AppResult<ChatRoom> {
        let name = validate_name(name)?;
        let room = self.rooms.create_room(post_id, name, owner_id).await?;
        info!(post_id = %post_id, owner_id = %owner_id, "Chat room created");
        Ok(room)
    }

    pub async fn rename_room(&self, post_id: PostId, name: &str) -> AppResult<ChatRoom> {
        let name = validate_name(name)?;
        self.rooms.rename_room(post_id, name).await
    }

    /// Delete a room with everything in it. Deleting a missing room is a
    /// not-found error.
    pub async fn delete_room(&self, post_id: PostId) -> AppResult<()> {
        if !self.rooms.delete_room(post_id).await? {
            return Err(AppError::not_found(format!("Chat room {post_id} not found")));
        }
        info!(post_id = %post_id, "Chat room deleted");
        Ok(())
    }

    /// Join a user to a room. Existing members are left as they are.
    pub async fn add_member(&self, post_id: PostId, user_id: UserId) -> AppResult<RoomMembership> {
        if self.rooms.find_room(post_id).await?.is_none() {
            return Err(AppError::not_found(format!("Chat room {post_id} not found")));
        }
        self.rooms.add_member(post_id, user_id).await
    }

    /// Returns `true` if the user was a member.
    pub async fn remove_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        self.rooms.remove_member(post_id, user_id).await
    }
}

fn validate_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Room name must not be empty"));
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(AppError::validation(format!(
            "Room name must be at most {MAX_ROOM_NAME_LEN} characters"
        )));
    }
    Ok(name)
}
