//! Room sessions: which connections are in which personal group.
//!
//! Every online user has exactly one group, `user:{id}`, holding all of
//! their live connections. Rooms do not have groups of their own; the
//! dispatcher delivers a room message by writing into each member's
//! personal group.

use std::collections::HashSet;
use std::sync::Arc;

use sparkup_core::types::UserId;

use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::pool::ConnectionPool;
use crate::group::GroupRegistry;

/// Name of a user's personal delivery group.
pub fn personal_channel(user_id: UserId) -> String {
    format!("user:{user_id}")
}

/// Maps online users to the connections in their personal group.
#[derive(Debug)]
pub struct RoomSessionManager {
    groups: GroupRegistry,
    pool: Arc<ConnectionPool>,
}

impl RoomSessionManager {
    /// Create a session manager resolving connections through `pool`.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            groups: GroupRegistry::new(),
            pool,
        }
    }

    /// Put a connection into its user's personal group.
    pub fn join_personal(&self, handle: &ConnectionHandle) {
        self.groups.join(&personal_channel(handle.user_id), handle.id);
    }

    /// Remove a connection from every group. Returns the groups it left.
    pub fn leave_all(&self, conn_id: ConnectionId) -> HashSet<String> {
        self.groups.leave_all(conn_id)
    }

    /// Live connections in a user's personal group.
    pub fn group_members(&self, user_id: UserId) -> Vec<Arc<ConnectionHandle>> {
        self.groups
            .connections(&personal_channel(user_id))
            .iter()
            .filter_map(|conn_id| self.pool.get(conn_id))
            .collect()
    }

    /// Whether the user has at least one connection in their group.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.groups.len(&personal_channel(user_id)) > 0
    }

    /// Groups a connection currently belongs to.
    pub fn groups_of(&self, conn_id: ConnectionId) -> HashSet<String> {
        self.groups.groups_of(conn_id)
    }

    /// Number of personal groups with at least one connection.
    pub fn group_count(&self) -> usize {
        self.groups.group_count()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_join_and_leave_personal_group() {
        let pool = Arc::new(ConnectionPool::new());
        let sessions = RoomSessionManager::new(pool.clone());
        let (tx, _rx) = mpsc::channel(1);
        let handle = Arc::new(ConnectionHandle::new(UserId(7), "default".into(), tx));
        pool.add(handle.clone());

        assert!(!sessions.is_online(UserId(7)));
        sessions.join_personal(&handle);
        assert!(sessions.is_online(UserId(7)));
        assert!(sessions.groups_of(handle.id).contains("user:7"));
        assert_eq!(sessions.group_members(UserId(7)).len(), 1);

        let left = sessions.leave_all(handle.id);
        assert_eq!(left.len(), 1);
        assert!(!sessions.is_online(UserId(7)));
        assert_eq!(sessions.group_count(), 0);
    }
}
