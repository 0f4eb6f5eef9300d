//! Hub method names that are not signaling relays.

pub const JOIN_GROUP: &str = "JoinGroup";
pub const LEAVE_GROUP: &str = "LeaveGroup";

/// Liveness check; the relay answers with a `HeartBeat` event to the caller only.
pub const HEARTBEAT: &str = "HeartBeat";

pub const HEARTBEAT_REPLY: &str = "I'm alive";
