//! Member list with participation levels.

use std::sync::Arc;

use sparkup_core::error::AppError;
use sparkup_core::result::AppResult;
use sparkup_core::types::PostId;
use sparkup_database::store::{MembershipStore, RoomStore};
use sparkup_entity::membership::MemberProfile;

/// Lists a room's members, host first.
#[derive(Clone)]
pub struct MemberService {
    rooms: Arc<dyn RoomStore>,
    members: Arc<dyn MembershipStore>,
}

impl std::fmt::Debug for MemberService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberService").finish()
    }
}

impl MemberService {
    pub fn new(rooms: Arc<dyn RoomStore>, members: Arc<dyn MembershipStore>) -> Self {
        Self { rooms, members }
    }

    pub async fn list_members(&self, post_id: PostId) -> AppResult<Vec<MemberProfile>> {
        if self.rooms.find_room(post_id).await?.is_none() {
            return Err(AppError::not_found(format!("Chat room {post_id} not found")));
        }
        let mut members = self.members.member_profiles(post_id).await?;
        MemberProfile::sort_for_listing(&mut members);
        Ok(members)
    }
}
