//! Application state shared across all handlers.

use std::sync::Arc;

use sparkup_core::config::AppConfig;
use sparkup_database::ChatStores;
use sparkup_realtime::RealtimeEngine;
use sparkup_service::{HistoryService, MemberService, RoomService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Store handles for the configured backend
    pub stores: ChatStores,

    // ── Realtime ─────────────────────────────────────────────
    /// WebSocket chat engine
    pub realtime: Arc<RealtimeEngine>,

    // ── Services ─────────────────────────────────────────────
    /// Message history and unread counts
    pub history_service: Arc<HistoryService>,
    /// Room listing and lifecycle
    pub room_service: Arc<RoomService>,
    /// Member list
    pub member_service: Arc<MemberService>,
}

impl AppState {
    /// Wire the services onto the given stores.
    pub fn new(config: AppConfig, stores: ChatStores, realtime: RealtimeEngine) -> Self {
        let history_service = Arc::new(HistoryService::new(
            stores.members.clone(),
            stores.messages.clone(),
        ));
        let room_service = Arc::new(RoomService::new(
            stores.rooms.clone(),
            stores.members.clone(),
        ));
        let member_service = Arc::new(MemberService::new(
            stores.rooms.clone(),
            stores.members.clone(),
        ));

        Self {
            config: Arc::new(config),
            stores,
            realtime: Arc::new(realtime),
            history_service,
            room_service,
            member_service,
        }
    }
}
