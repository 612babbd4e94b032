//! Top-level real-time engine that ties the subsystems together.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use sparkup_cache::MembershipCache;
use sparkup_core::config::RealtimeConfig;
use sparkup_core::result::AppResult;
use sparkup_database::store::MessageStore;

use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::dispatch::dispatcher::MessageDispatcher;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::session::RoomSessionManager;

/// The chat engine owned by the server process. Created once at startup
/// and shared through application state.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection registry.
    pub connections: Arc<ConnectionManager>,
    /// Personal delivery groups.
    pub sessions: Arc<RoomSessionManager>,
    /// `send_message` dispatcher.
    pub dispatcher: Arc<MessageDispatcher>,
    /// Counters.
    pub metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connections.connection_count())
            .finish()
    }
}

/// Live engine statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Registered connections.
    pub connections: usize,
    /// Distinct connected users.
    pub users: usize,
    /// Counter snapshot.
    pub metrics: MetricsSnapshot,
}

impl RealtimeEngine {
    /// Creates the engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        members: MembershipCache,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let sessions = Arc::new(RoomSessionManager::new(pool.clone()));
        let connections = Arc::new(ConnectionManager::new(
            config,
            pool,
            sessions.clone(),
            metrics.clone(),
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            members,
            messages,
            connections.clone(),
            metrics.clone(),
        ));

        info!("Real-time engine initialized");

        Self {
            connections,
            sessions,
            dispatcher,
            metrics,
        }
    }

    /// Current connection counts and counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connections: self.connections.connection_count(),
            users: self.connections.user_count(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Close every connection.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down real-time engine");
        self.connections.close_all().await;
        Ok(())
    }
}
