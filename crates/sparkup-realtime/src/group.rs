//! Named delivery groups keyed by connection id.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

/// Two-way index between group names and the connections in them.
///
/// A group exists only while it has at least one connection.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    members: DashMap<String, HashSet<ConnectionId>>,
    joined: DashMap<ConnectionId, HashSet<String>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a connection into a group.
    pub fn join(&self, group: &str, conn_id: ConnectionId) {
        self.members
            .entry(group.to_string())
            .or_default()
            .insert(conn_id);
        self.joined
            .entry(conn_id)
            .or_default()
            .insert(group.to_string());
    }

    /// Take a connection out of every group. Returns the names it left.
    pub fn leave_all(&self, conn_id: ConnectionId) -> HashSet<String> {
        let Some((_, groups)) = self.joined.remove(&conn_id) else {
            return HashSet::new();
        };
        for group in &groups {
            if let Some(mut conns) = self.members.get_mut(group) {
                conns.remove(&conn_id);
            }
            self.members.remove_if(group, |_, conns| conns.is_empty());
        }
        groups
    }

    pub fn connections(&self, group: &str) -> Vec<ConnectionId> {
        self.members
            .get(group)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn groups_of(&self, conn_id: ConnectionId) -> HashSet<String> {
        self.joined
            .get(&conn_id)
            .map(|groups| groups.clone())
            .unwrap_or_default()
    }

    pub fn len(&self, group: &str) -> usize {
        self.members.get(group).map_or(0, |conns| conns.len())
    }

    /// Number of non-empty groups.
    pub fn group_count(&self) -> usize {
        self.members.len()
    }
}
