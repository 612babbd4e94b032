//! Response DTOs.

use serde::{Deserialize, Serialize};

use sparkup_core::types::PageResponse;
use sparkup_entity::membership::MemberProfile;
use sparkup_entity::room::RoomOverview;
use sparkup_realtime::metrics::MetricsSnapshot;

/// Body of the room list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomOverview>,
    pub page: u64,
    pub pages: u64,
    pub per_page: u64,
    pub total: u64,
}

impl From<PageResponse<RoomOverview>> for RoomListResponse {
    fn from(page: PageResponse<RoomOverview>) -> Self {
        Self {
            rooms: page.items,
            page: page.page,
            pages: page.pages,
            per_page: page.per_page,
            total: page.total,
        }
    }
}

/// Body of the member list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberProfile>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// `connected` or `unavailable`.
    pub database: String,
    /// Live WebSocket connections.
    pub ws_connections: usize,
    /// Distinct online users.
    pub online_users: usize,
    /// Dispatcher counters.
    pub realtime: MetricsSnapshot,
}
