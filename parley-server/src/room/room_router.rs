use crate::room::Room;
use dashmap::DashMap;
use parley_core::{ConnectionId, HEARTBEAT, HEARTBEAT_REPLY, RoomName, ServerFrame, SignalKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound queue of one connection. Everything the relay sends to a
/// connection goes through this single FIFO, which is what keeps
/// per-recipient ordering equal to send order.
pub type Outbound = mpsc::UnboundedSender<ServerFrame>;

#[derive(Default)]
struct RouterInner {
    connections: DashMap<ConnectionId, Outbound>,
    rooms: DashMap<RoomName, Room>,
    memberships: DashMap<ConnectionId, HashSet<RoomName>>,
}

/// Groups connections by room name and fans call-control messages out to
/// everyone else in a room. Messages are never stored: a member that is not
/// registered at relay time misses them for good.
#[derive(Clone, Default)]
pub struct RoomRouter {
    inner: Arc<RouterInner>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: ConnectionId, outbound: Outbound) {
        debug!("Registering connection {}", connection_id);
        self.inner.connections.insert(connection_id, outbound);
    }

    /// Drops the connection and removes it from every room it was in.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        self.inner.connections.remove(connection_id);

        let Some((_, rooms)) = self.inner.memberships.remove(connection_id) else {
            return;
        };
        for room in rooms {
            self.remove_member(&room, connection_id);
        }
        info!("Connection {} left all rooms", connection_id);
    }

    pub fn join(&self, connection_id: ConnectionId, room: RoomName) {
        let mut entry = self.inner.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room);
            Room::default()
        });
        if !entry.add(connection_id) {
            debug!("Connection {} already in room {}", connection_id, room);
            return;
        }
        drop(entry);

        self.inner
            .memberships
            .entry(connection_id)
            .or_default()
            .insert(room.clone());
        info!("Connection {} joined room {}", connection_id, room);
    }

    pub fn leave(&self, connection_id: &ConnectionId, room: &RoomName) {
        if let Some(mut rooms) = self.inner.memberships.get_mut(connection_id) {
            rooms.remove(room);
        }
        self.inner
            .memberships
            .remove_if(connection_id, |_, rooms| rooms.is_empty());

        if self.remove_member(room, connection_id) {
            info!("Connection {} left room {}", connection_id, room);
        }
    }

    /// Delivers `payload` as the event for `kind` to every member of `room`
    /// except `sender`. Returns how many recipients were handed the event;
    /// an unknown room yields zero.
    pub fn relay(
        &self,
        sender: &ConnectionId,
        room: &RoomName,
        kind: SignalKind,
        payload: Value,
    ) -> usize {
        let recipients = match self.inner.rooms.get(room) {
            Some(members) => members.others(sender),
            None => {
                debug!("Relay of {:?} to empty room {} absorbed", kind, room);
                return 0;
            }
        };

        let frame = ServerFrame::event(
            kind.event_name(),
            vec![Value::String(room.to_string()), payload],
        );

        let delivered = recipients
            .iter()
            .filter(|id| self.send_frame(id, frame.clone()))
            .count();

        debug!(
            "Relayed {:?} from {} in room {} to {} peer(s)",
            kind, sender, room, delivered
        );
        delivered
    }

    /// Answers a heartbeat on the sending connection only.
    pub fn heartbeat(&self, connection_id: &ConnectionId) {
        let frame = ServerFrame::event(HEARTBEAT, vec![Value::from(HEARTBEAT_REPLY)]);
        self.send_frame(connection_id, frame);
    }

    pub fn send_frame(&self, connection_id: &ConnectionId, frame: ServerFrame) -> bool {
        let Some(outbound) = self.inner.connections.get(connection_id) else {
            warn!(
                "Attempted to send frame to disconnected connection {}",
                connection_id
            );
            return false;
        };
        if outbound.send(frame).is_err() {
            warn!("Outbound queue closed for connection {}", connection_id);
            return false;
        }
        true
    }

    pub fn members(&self, room: &RoomName) -> Vec<ConnectionId> {
        self.inner
            .rooms
            .get(room)
            .map(|r| r.members())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<RoomName> {
        self.inner
            .memberships
            .get(connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    fn remove_member(&self, room: &RoomName, connection_id: &ConnectionId) -> bool {
        let removed = match self.inner.rooms.get_mut(room) {
            Some(mut members) => members.remove(connection_id),
            None => false,
        };
        if self
            .inner
            .rooms
            .remove_if(room, |_, members| members.is_empty())
            .is_some()
        {
            info!("Room {} is empty, dropping it", room);
        }
        removed
    }
}
