//! Room membership entities.

pub mod level;
pub mod model;
pub mod profile;

pub use level::ParticipationLevel;
pub use model::{RoomMember, RoomMembership};
pub use profile::MemberProfile;
