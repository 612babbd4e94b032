//! Member listing entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sparkup_core::types::UserId;

use super::level::ParticipationLevel;

/// A room member with profile details for the member list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    /// The member.
    pub user_id: UserId,
    /// Profile nickname or "Unknown".
    pub display_name: String,
    /// Average reference rating, 0 when unrated.
    pub rating: f64,
    /// When the member joined this room.
    #[serde(with = "sparkup_core::types::timestamp")]
    pub joined_at: DateTime<Utc>,
    /// Whether the member owns the post.
    pub is_host: bool,
    /// Number of other rooms the member belongs to.
    #[serde(skip_serializing)]
    pub participations: u64,
    /// Tier derived from `participations`.
    pub level: ParticipationLevel,
}

impl MemberProfile {
    /// Sort hosts first, then by join time, then by id for stability.
    pub fn sort_for_listing(members: &mut [MemberProfile]) {
        members.sort_by(|a, b| {
            b.is_host
                .cmp(&a.is_host)
                .then(a.joined_at.cmp(&b.joined_at))
                .then(a.user_id.cmp(&b.user_id))
        });
    }
}
