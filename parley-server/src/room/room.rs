use parley_core::ConnectionId;
use std::collections::HashSet;

/// Member set of one named room. The router owns rooms and drops them as
/// soon as the last member leaves.
#[derive(Debug, Default)]
pub struct Room {
    members: HashSet<ConnectionId>,
}

impl Room {
    /// Returns `false` if the connection was already a member.
    pub fn add(&mut self, connection_id: ConnectionId) -> bool {
        self.members.insert(connection_id)
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> bool {
        self.members.remove(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains(connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Every member except `sender`.
    pub fn others(&self, sender: &ConnectionId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|id| *id != sender)
            .copied()
            .collect()
    }

    pub fn members(&self) -> Vec<ConnectionId> {
        self.members.iter().copied().collect()
    }
}
